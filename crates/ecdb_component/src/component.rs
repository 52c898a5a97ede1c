//! Core [`Component`] trait and type identity.
//!
//! Every value stored in the database implements [`Component`]. The only
//! capability the database needs from a component is a deep copy, which it
//! gets from `Clone` and uses when an entity is cloned.
//!
//! ## Type Identity
//!
//! A component type has two identities:
//!
//! - [`ComponentKey`]: the Rust-level key (`TypeId` plus a readable name).
//!   It is what generic code can compute without touching any database.
//! - [`Tid`]: the dense table identifier a database hands out when the type
//!   is registered. Tables, entity rows, and query signatures are keyed by it.

use std::any::TypeId;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A dense component type identifier, assigned at registration.
///
/// TIDs start at zero and increase by one per registered type, so they double
/// as indices into the table store. A TID is never revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tid(pub u32);

impl Tid {
    /// Returns the TID as a table-store index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tid({})", self.0)
    }
}

/// The Rust-level key of a component type.
///
/// Equality and hashing use only the `TypeId`; the name is carried along for
/// error messages and diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct ComponentKey {
    /// The Rust type identity.
    pub type_id: TypeId,
    /// Human-readable type name (e.g. `"Position"`).
    pub name: &'static str,
}

impl ComponentKey {
    /// Returns the key for component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::type_name(),
        }
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKey {}

impl std::hash::Hash for ComponentKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

/// Metadata recorded for every registered component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    /// The table identifier assigned at registration.
    pub tid: Tid,
    /// The human-readable name of the component.
    pub name: &'static str,
    /// Size of one component value in bytes.
    pub size: usize,
}

impl ComponentInfo {
    /// Builds the metadata for `T` under the given TID.
    #[must_use]
    pub fn new<T: Component>(tid: Tid) -> Self {
        Self {
            tid,
            name: T::type_name(),
            size: std::mem::size_of::<T>(),
        }
    }
}

/// The core component trait.
///
/// `Clone` is the deep-copy used when an entity is cloned: the copy must not
/// share mutable state with the original.
///
/// # Examples
///
/// ```rust
/// use ecdb_component::Component;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn describe(&self) -> Option<String> {
///         Some(format!("{self:?}"))
///     }
/// }
///
/// assert_eq!(Health::type_name(), "Health");
/// ```
pub trait Component: Clone + 'static {
    /// A human-readable name for this component type.
    ///
    /// Defaults to the last path segment of [`std::any::type_name`].
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        // Generic arguments may contain `::`, so only split the outer path.
        let outer = full.split('<').next().unwrap_or(full);
        match outer.rfind("::") {
            Some(pos) => &full[pos + 2..],
            None => full,
        }
    }

    /// Optional diagnostic rendering of this value.
    ///
    /// Used only for diagnostics, never for behavior.
    fn describe(&self) -> Option<String> {
        None
    }
}

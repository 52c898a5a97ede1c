//! Component type registry: assigns a [`Tid`] to each component type.
//!
//! Registration is explicit: a type must be registered once before components
//! of that type can be attached, and registering it twice is an error. TIDs
//! are dense and assigned in registration order, so they index the table
//! store directly.

use std::collections::HashMap;

use ecdb_component::{Component, ComponentInfo, ComponentKey, Tid};
use tracing::debug;

use crate::error::DatabaseError;

/// Registry of every component type known to one database.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// TIDs keyed by Rust type identity.
    by_key: HashMap<ComponentKey, Tid>,
    /// Metadata indexed by TID.
    infos: Vec<ComponentInfo>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register component type `T` and return its fresh TID.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::AlreadyRegistered`] if `T` was registered before.
    pub fn register<T: Component>(&mut self) -> Result<Tid, DatabaseError> {
        let key = ComponentKey::of::<T>();
        if self.by_key.contains_key(&key) {
            return Err(DatabaseError::AlreadyRegistered(key.name));
        }
        let tid = Tid(self.infos.len() as u32);
        self.by_key.insert(key, tid);
        self.infos.push(ComponentInfo::new::<T>(tid));
        debug!(component = key.name, %tid, "registered component type");
        Ok(tid)
    }

    /// Returns the TID of a registered type, if any.
    #[must_use]
    pub fn get(&self, key: ComponentKey) -> Option<Tid> {
        self.by_key.get(&key).copied()
    }

    /// Returns the TID of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UnregisteredType`] if the type is unknown.
    pub fn resolve(&self, key: ComponentKey) -> Result<Tid, DatabaseError> {
        self.get(key).ok_or(DatabaseError::UnregisteredType(key.name))
    }

    /// Returns the TID of component type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UnregisteredType`] if `T` is unknown.
    pub fn tid<T: Component>(&self) -> Result<Tid, DatabaseError> {
        self.resolve(ComponentKey::of::<T>())
    }

    /// Returns the metadata of a registered type.
    #[must_use]
    pub fn info(&self, tid: Tid) -> Option<&ComponentInfo> {
        self.infos.get(tid.index())
    }

    /// Returns the name of a registered type, or `"?"` for an unknown TID.
    #[must_use]
    pub fn name(&self, tid: Tid) -> &'static str {
        self.info(tid).map_or("?", |info| info.name)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if no type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

//! Entity and component-instance identifiers.
//!
//! An [`Entity`] is a lightweight `u64` handle with no inherent data. A
//! [`Cid`] names one component value inside its type's table. Both are handed
//! out by monotonically increasing allocators and are never reused within a
//! process run, so a stale handle can never alias a newer one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers. Components attached to them give them
/// meaning. Ordering follows creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A component instance identifier, unique across every table of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cid(pub u64);

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.0)
    }
}

/// Allocates monotonically increasing entity IDs.
///
/// There is deliberately no free-list: destroyed IDs stay retired.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh entity ID.
    pub fn allocate(&mut self) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        Entity(id)
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocates monotonically increasing component IDs.
#[derive(Debug, Default)]
pub struct CidAllocator {
    issued: u64,
}

impl CidAllocator {
    /// Creates a new allocator. The first CID issued is `Cid(1)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh component ID.
    pub fn allocate(&mut self) -> Cid {
        self.issued += 1;
        Cid(self.issued)
    }
}

//! Entity table: which component types each live entity owns.
//!
//! The row of an entity maps each owned [`Tid`] to the [`Cid`] of the
//! component in that type's table. Rows hold lookup keys only; the values are
//! owned by the component tables.

use std::collections::HashMap;

use ecdb_component::{Cid, Entity, Tid};

/// The component locations of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRow {
    components: HashMap<Tid, Cid>,
}

impl EntityRow {
    /// Returns the location of the component of type `tid`.
    #[must_use]
    pub fn get(&self, tid: Tid) -> Option<Cid> {
        self.components.get(&tid).copied()
    }

    /// Returns `true` if the entity owns a component of type `tid`.
    #[must_use]
    pub fn has(&self, tid: Tid) -> bool {
        self.components.contains_key(&tid)
    }

    /// Returns the number of components the entity owns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the entity owns no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The owned types, sorted by TID.
    #[must_use]
    pub fn tids(&self) -> Vec<Tid> {
        let mut tids: Vec<Tid> = self.components.keys().copied().collect();
        tids.sort_unstable();
        tids
    }

    /// Iterate over `(tid, cid)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Tid, Cid)> + '_ {
        self.components.iter().map(|(&tid, &cid)| (tid, cid))
    }

    pub(crate) fn insert(&mut self, tid: Tid, cid: Cid) -> Option<Cid> {
        self.components.insert(tid, cid)
    }

    pub(crate) fn remove(&mut self, tid: Tid) -> Option<Cid> {
        self.components.remove(&tid)
    }
}

/// Rows of every live entity.
#[derive(Debug, Default)]
pub struct EntityTable {
    rows: HashMap<Entity, EntityRow>,
}

impl EntityTable {
    /// Create an empty table with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: HashMap::with_capacity(capacity),
        }
    }

    /// Add an empty row for a newly created entity.
    pub fn insert(&mut self, entity: Entity) {
        self.rows.insert(entity, EntityRow::default());
    }

    /// Remove and return the row of `entity`.
    pub fn remove(&mut self, entity: Entity) -> Option<EntityRow> {
        self.rows.remove(&entity)
    }

    /// Returns the row of `entity`.
    #[must_use]
    pub fn row(&self, entity: Entity) -> Option<&EntityRow> {
        self.rows.get(&entity)
    }

    /// Returns the row of `entity`, mutably.
    #[must_use]
    pub fn row_mut(&mut self, entity: Entity) -> Option<&mut EntityRow> {
        self.rows.get_mut(&entity)
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

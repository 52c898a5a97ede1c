//! Per-type component storage.
//!
//! Each registered component type owns exactly one [`ComponentTable`]: a map
//! from [`Cid`] to the stored value and its owning entity, plus the set of
//! entities that currently own a value of that type.
//!
//! Tables are kept type-erased behind [`ErasedTable`] inside a [`TableStore`]
//! indexed by [`Tid`]. Typed code downcasts back to `ComponentTable<T>`.
//!
//! ```text
//! TableStore
//!   [Tid(0)] ComponentTable<Position> { slots: {Cid(1) -> (Entity(1), ..)}, owners: {Entity(1)} }
//!   [Tid(1)] ComponentTable<Velocity> { slots: {Cid(2) -> (Entity(1), ..)}, owners: {Entity(1)} }
//! ```

use std::any::Any;
use std::collections::{HashMap, HashSet};

use crate::component::{Component, Tid};
use crate::entity::{Cid, CidAllocator, Entity};

/// One stored component value and the entity that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot<T> {
    /// The owning entity.
    pub owner: Entity,
    /// The component value.
    pub value: T,
}

/// Storage for every live component of a single type.
#[derive(Debug, Clone)]
pub struct ComponentTable<T> {
    tid: Tid,
    slots: HashMap<Cid, Slot<T>>,
    owners: HashSet<Entity>,
}

impl<T: Component> ComponentTable<T> {
    /// Create a new, empty table for the type registered under `tid`.
    #[must_use]
    pub fn new(tid: Tid) -> Self {
        Self {
            tid,
            slots: HashMap::new(),
            owners: HashSet::new(),
        }
    }

    /// Store `value` under `cid`, owned by `owner`.
    ///
    /// The caller guarantees `cid` is fresh and that `owner` does not already
    /// own a component in this table.
    pub fn insert(&mut self, cid: Cid, owner: Entity, value: T) -> &mut T {
        debug_assert!(!self.slots.contains_key(&cid), "{cid} inserted twice");
        self.owners.insert(owner);
        &mut self.slots.entry(cid).or_insert(Slot { owner, value }).value
    }

    /// Remove the component stored under `cid`, returning its slot.
    pub fn remove(&mut self, cid: Cid) -> Option<Slot<T>> {
        let slot = self.slots.remove(&cid)?;
        self.owners.remove(&slot.owner);
        Some(slot)
    }

    /// Returns a reference to the value stored under `cid`.
    #[must_use]
    pub fn get(&self, cid: Cid) -> Option<&T> {
        self.slots.get(&cid).map(|slot| &slot.value)
    }

    /// Returns a mutable reference to the value stored under `cid`.
    #[must_use]
    pub fn get_mut(&mut self, cid: Cid) -> Option<&mut T> {
        self.slots.get_mut(&cid).map(|slot| &mut slot.value)
    }
}

/// Type-erased face of a [`ComponentTable`].
///
/// Lets the database free, copy, and inspect slots without knowing the
/// component type. The copy path is the per-type deep-copy function keyed by
/// TID that entity cloning relies on.
pub trait ErasedTable: Any {
    /// Returns the TID this table stores.
    fn tid(&self) -> Tid;

    /// Returns the component type name.
    fn type_name(&self) -> &'static str;

    /// Returns the number of live components.
    fn len(&self) -> usize;

    /// Returns `true` if the table holds no components.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the set of entities owning a component in this table.
    fn owner_set(&self) -> &HashSet<Entity>;

    /// Iterate over every `(cid, owner)` pair in storage order.
    fn entries(&self) -> Box<dyn Iterator<Item = (Cid, Entity)> + '_>;

    /// Drop the component stored under `cid`. Returns `false` if absent.
    fn erase(&mut self, cid: Cid) -> bool;

    /// Deep-copy the component under `source` into a new slot owned by
    /// `owner`, returning the slot's CID. A CID is drawn from `cids` only once
    /// the copy exists, so an absent `source` returns `None` and issues nothing.
    fn duplicate(&mut self, source: Cid, owner: Entity, cids: &mut CidAllocator) -> Option<Cid>;

    /// Diagnostic rendering of the component under `cid`.
    fn describe(&self, cid: Cid) -> Option<String>;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcast an owned table for typed downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Component> ErasedTable for ComponentTable<T> {
    fn tid(&self) -> Tid {
        self.tid
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn owner_set(&self) -> &HashSet<Entity> {
        &self.owners
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (Cid, Entity)> + '_> {
        Box::new(self.slots.iter().map(|(&cid, slot)| (cid, slot.owner)))
    }

    fn erase(&mut self, cid: Cid) -> bool {
        self.remove(cid).is_some()
    }

    fn duplicate(&mut self, source: Cid, owner: Entity, cids: &mut CidAllocator) -> Option<Cid> {
        let copy = self.get(source)?.clone();
        let target = cids.allocate();
        self.insert(target, owner, copy);
        Some(target)
    }

    fn describe(&self, cid: Cid) -> Option<String> {
        self.get(cid).and_then(|value| value.describe())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// All component tables of a database, indexed by [`Tid`].
///
/// A slot is `None` only while its table is extracted for exclusive typed
/// access (see [`TableStore::extract`]).
#[derive(Default)]
pub struct TableStore {
    tables: Vec<Option<Box<dyn ErasedTable>>>,
}

impl TableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `table` at the index of its TID.
    pub fn install(&mut self, table: Box<dyn ErasedTable>) {
        let index = table.tid().index();
        if self.tables.len() <= index {
            self.tables.resize_with(index + 1, || None);
        }
        self.tables[index] = Some(table);
    }

    /// Returns the type-erased table for `tid`.
    #[must_use]
    pub fn get(&self, tid: Tid) -> Option<&dyn ErasedTable> {
        self.tables.get(tid.index())?.as_deref()
    }

    /// Returns the type-erased table for `tid`, mutably.
    #[must_use]
    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut (dyn ErasedTable + 'static)> {
        self.tables.get_mut(tid.index())?.as_deref_mut()
    }

    /// Returns the typed table for `tid`, if it stores `T`.
    #[must_use]
    pub fn typed<T: Component>(&self, tid: Tid) -> Option<&ComponentTable<T>> {
        self.get(tid)?.as_any().downcast_ref()
    }

    /// Returns the typed table for `tid` mutably, if it stores `T`.
    #[must_use]
    pub fn typed_mut<T: Component>(&mut self, tid: Tid) -> Option<&mut ComponentTable<T>> {
        self.get_mut(tid)?.as_any_mut().downcast_mut()
    }

    /// Take the typed table for `tid` out of the store.
    ///
    /// Extracting lets several tables be borrowed mutably at once without
    /// aliasing the store. The table must be handed back with
    /// [`TableStore::restore`]. Returns `None` if the table is missing, already
    /// extracted, or does not store `T`.
    pub fn extract<T: Component>(&mut self, tid: Tid) -> Option<Box<ComponentTable<T>>> {
        let slot = self.tables.get_mut(tid.index())?;
        if !slot.as_ref()?.as_any().is::<ComponentTable<T>>() {
            return None;
        }
        slot.take()?.into_any().downcast().ok()
    }

    /// Return a previously extracted table to its slot.
    pub fn restore(&mut self, table: Box<dyn ErasedTable>) {
        self.install(table);
    }

    /// Iterate over every installed table.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ErasedTable> {
        self.tables.iter().filter_map(|slot| slot.as_deref())
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|t| (t.tid(), t.type_name(), t.len())))
            .finish()
    }
}

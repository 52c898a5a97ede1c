//! The entity-component database.
//!
//! [`Database`] ties the pieces together: the [`TypeRegistry`] names component
//! types, each type's values live in a component table inside a
//! [`TableStore`], the [`EntityTable`] records which types each entity owns,
//! and the [`QueryCache`] memoizes query results between mutations.
//!
//! Every mutation invalidates exactly the cached signatures whose membership
//! it could change:
//!
//! | operation | invalidates signatures mentioning |
//! |-----------|-----------------------------------|
//! | `attach::<T>` / `detach::<T>` | `T` |
//! | `clone_entity(e)` | any type `e` owns |
//! | `destroy(e)` | any type `e` owned, or everything under [`DestroyInvalidation::FullClear`] |

use std::borrow::Cow;

use ecdb_component::{
    CidAllocator, Component, ComponentKey, ComponentSet, ComponentTable, Entity,
    EntityAllocator, Filter, TableStore, Tid,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::cache::QueryCache;
use crate::config::{DatabaseConfig, DestroyInvalidation};
use crate::entity_table::EntityTable;
use crate::error::DatabaseError;
use crate::query::{Plan, Query, scan};
use crate::registry::TypeRegistry;

/// A point-in-time summary of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Live entities.
    pub entities: usize,
    /// Live components across all tables.
    pub components: usize,
    /// Registered component types.
    pub component_types: usize,
    /// Signatures currently held by the query cache.
    pub cached_queries: usize,
    /// Cached lookups answered without scanning.
    pub cache_hits: u64,
    /// Cached lookups that had to scan.
    pub cache_misses: u64,
    /// Cache entries dropped by invalidation.
    pub cache_invalidations: u64,
}

/// An in-memory entity-component database.
///
/// # Examples
///
/// ```rust
/// use ecdb::{Component, Database, Not};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Position(f64);
/// impl Component for Position {}
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Velocity(f64);
/// impl Component for Velocity {}
///
/// # fn main() -> Result<(), ecdb::DatabaseError> {
/// let mut db = Database::new();
/// db.register::<Position>()?;
/// db.register::<Velocity>()?;
///
/// let moving = db.create_entity();
/// db.attach(moving, Position(0.0))?;
/// db.attach(moving, Velocity(1.5))?;
/// let fixed = db.create_entity();
/// db.attach(fixed, Position(9.0))?;
///
/// db.get_entities::<(Position, Velocity)>()?
///     .for_each_mut(|_, (pos, vel)| pos.0 += vel.0);
/// assert_eq!(db.get::<Position>(moving), Some(&Position(1.5)));
///
/// let statics = db.get_entities_filtered::<Position, Not<Velocity>>()?;
/// assert_eq!(statics.entities(), &[fixed]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Database {
    config: DatabaseConfig,
    registry: TypeRegistry,
    entities: EntityTable,
    tables: TableStore,
    cache: QueryCache,
    entity_ids: EntityAllocator,
    cids: CidAllocator,
}

impl Database {
    /// Create an empty database with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty database with the given configuration.
    #[must_use]
    pub fn with_config(config: DatabaseConfig) -> Self {
        Self {
            entities: EntityTable::with_capacity(config.entity_capacity),
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // -- Component types --

    /// Register component type `T` and create its table.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::AlreadyRegistered`] if `T` was registered before.
    pub fn register<T: Component>(&mut self) -> Result<Tid, DatabaseError> {
        let tid = self.registry.register::<T>()?;
        self.tables.install(Box::new(ComponentTable::<T>::new(tid)));
        Ok(tid)
    }

    /// Returns the TID of `T`. Stable for the life of the database.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UnregisteredType`] if `T` is unknown.
    pub fn tid<T: Component>(&self) -> Result<Tid, DatabaseError> {
        self.registry.tid::<T>()
    }

    /// The registry of component types.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // -- Entity lifecycle --

    /// Create a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entity_ids.allocate();
        self.entities.insert(entity);
        trace!(%entity, "created entity");
        entity
    }

    /// Returns `true` if `entity` exists.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Create a new entity holding a copy of every component `source` owns.
    ///
    /// The copies are independent: mutating one entity's component never
    /// affects the other's.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoSuchEntity`] if `source` does not exist.
    pub fn clone_entity(&mut self, source: Entity) -> Result<Entity, DatabaseError> {
        let row = self
            .entities
            .row(source)
            .ok_or(DatabaseError::NoSuchEntity(source))?;
        let mut components: Vec<_> = row.iter().collect();
        components.sort_unstable();

        let target = self.entity_ids.allocate();
        self.entities.insert(target);

        for &(tid, cid) in &components {
            let copy = self
                .tables
                .get_mut(tid)
                .and_then(|table| table.duplicate(cid, target, &mut self.cids));
            debug_assert!(copy.is_some(), "{source} lists {tid} without a stored {cid}");
            let Some(copy) = copy else {
                continue;
            };
            if let Some(row) = self.entities.row_mut(target) {
                row.insert(tid, copy);
            }
        }

        self.cache.invalidate_types(components.iter().map(|&(tid, _)| tid));
        trace!(%source, %target, components = components.len(), "cloned entity");
        Ok(target)
    }

    /// Destroy `entity` and every component it owns.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoSuchEntity`] if `entity` does not exist.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), DatabaseError> {
        let row = self
            .entities
            .remove(entity)
            .ok_or(DatabaseError::NoSuchEntity(entity))?;

        for (tid, cid) in row.iter() {
            if let Some(table) = self.tables.get_mut(tid) {
                table.erase(cid);
            }
        }

        match self.config.destroy_invalidation {
            DestroyInvalidation::Precise => self.cache.invalidate_types(row.tids()),
            DestroyInvalidation::FullClear => self.cache.clear(),
        }
        trace!(%entity, components = row.len(), "destroyed entity");
        Ok(())
    }

    // -- Components --

    /// Attach `value` to `entity` and return a reference to the stored copy.
    ///
    /// # Errors
    ///
    /// - [`DatabaseError::UnregisteredType`] if `T` is unknown.
    /// - [`DatabaseError::NoSuchEntity`] if `entity` does not exist.
    /// - [`DatabaseError::DuplicateComponent`] if `entity` already owns a `T`;
    ///   [`detach`](Self::detach) it first.
    pub fn attach<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<&mut T, DatabaseError> {
        let tid = self.registry.tid::<T>()?;
        let row = self
            .entities
            .row_mut(entity)
            .ok_or(DatabaseError::NoSuchEntity(entity))?;
        if row.has(tid) {
            return Err(DatabaseError::DuplicateComponent {
                entity,
                component: T::type_name(),
            });
        }
        let table = self
            .tables
            .typed_mut::<T>(tid)
            .ok_or(DatabaseError::UnregisteredType(T::type_name()))?;

        let cid = self.cids.allocate();
        row.insert(tid, cid);
        self.cache.invalidate_type(tid);
        trace!(%entity, %tid, %cid, "attached component");
        Ok(table.insert(cid, entity, value))
    }

    /// Remove the `T` component of `entity` and return it.
    ///
    /// # Errors
    ///
    /// - [`DatabaseError::UnregisteredType`] if `T` is unknown.
    /// - [`DatabaseError::NoSuchEntity`] if `entity` does not exist.
    /// - [`DatabaseError::MissingComponent`] if `entity` owns no `T`.
    pub fn detach<T: Component>(&mut self, entity: Entity) -> Result<T, DatabaseError> {
        let tid = self.registry.tid::<T>()?;
        let missing = DatabaseError::MissingComponent {
            entity,
            component: T::type_name(),
        };
        let row = self
            .entities
            .row_mut(entity)
            .ok_or(DatabaseError::NoSuchEntity(entity))?;
        let cid = row.remove(tid).ok_or_else(|| missing.clone())?;
        let slot = self
            .tables
            .typed_mut::<T>(tid)
            .and_then(|table| table.remove(cid))
            .ok_or(missing)?;

        self.cache.invalidate_type(tid);
        trace!(%entity, %tid, %cid, "detached component");
        Ok(slot.value)
    }

    /// Returns the `T` component of `entity`, if it has one.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let tid = self.registry.get(ComponentKey::of::<T>())?;
        let cid = self.entities.row(entity)?.get(tid)?;
        self.tables.typed::<T>(tid)?.get(cid)
    }

    /// Returns the `T` component of `entity` mutably, if it has one.
    ///
    /// Mutating a value never changes query membership, so the cache is left
    /// untouched.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let tid = self.registry.get(ComponentKey::of::<T>())?;
        let cid = self.entities.row(entity)?.get(tid)?;
        self.tables.typed_mut::<T>(tid)?.get_mut(cid)
    }

    /// Look up several components of `entity` at once.
    ///
    /// Each element is `None` when the entity lacks that component.
    ///
    /// ```rust
    /// # use ecdb::{Component, Database};
    /// # #[derive(Debug, Clone, PartialEq)] struct Position(f64);
    /// # impl Component for Position {}
    /// # #[derive(Debug, Clone, PartialEq)] struct Velocity(f64);
    /// # impl Component for Velocity {}
    /// # let mut db = Database::new();
    /// # db.register::<Position>().unwrap();
    /// # db.register::<Velocity>().unwrap();
    /// let e = db.create_entity();
    /// db.attach(e, Position(2.0)).unwrap();
    /// let (pos, vel) = db.get_many::<(Position, Velocity)>(e);
    /// assert_eq!(pos, Some(&Position(2.0)));
    /// assert!(vel.is_none());
    /// ```
    pub fn get_many<S: ComponentSet>(&self, entity: Entity) -> S::Opt<'_> {
        let keys = S::keys();
        let row = self.entities.row(entity);
        S::lookup(&self.tables, |i| {
            let tid = self.registry.get(*keys.get(i)?)?;
            Some((tid, row?.get(tid)?))
        })
    }

    /// Returns `true` if `entity` owns a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.registry
            .get(ComponentKey::of::<T>())
            .zip(self.entities.row(entity))
            .is_some_and(|(tid, row)| row.has(tid))
    }

    /// Every entity owning a `T`, sorted by id.
    #[must_use]
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        let Some(table) = self
            .registry
            .get(ComponentKey::of::<T>())
            .and_then(|tid| self.tables.get(tid))
        else {
            return Vec::new();
        };
        let mut owners: Vec<Entity> = table.owner_set().iter().copied().collect();
        owners.sort_unstable();
        owners
    }

    /// Returns the number of live `T` components.
    #[must_use]
    pub fn component_count<T: Component>(&self) -> usize {
        self.registry
            .get(ComponentKey::of::<T>())
            .and_then(|tid| self.tables.get(tid))
            .map_or(0, |table| table.len())
    }

    /// Names of the component types `entity` owns, in TID order.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoSuchEntity`] if `entity` does not exist.
    pub fn component_types(&self, entity: Entity) -> Result<Vec<&'static str>, DatabaseError> {
        let row = self
            .entities
            .row(entity)
            .ok_or(DatabaseError::NoSuchEntity(entity))?;
        Ok(row
            .tids()
            .into_iter()
            .map(|tid| self.registry.name(tid))
            .collect())
    }

    /// A diagnostic line per component of `entity`, in TID order.
    ///
    /// Components that implement [`Component::describe`] render as
    /// `Name: description`, the rest as just `Name`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoSuchEntity`] if `entity` does not exist.
    pub fn describe(&self, entity: Entity) -> Result<Vec<String>, DatabaseError> {
        let row = self
            .entities
            .row(entity)
            .ok_or(DatabaseError::NoSuchEntity(entity))?;
        let mut lines = Vec::with_capacity(row.len());
        for tid in row.tids() {
            let name = self.registry.name(tid);
            let detail = row
                .get(tid)
                .zip(self.tables.get(tid))
                .and_then(|(cid, table)| table.describe(cid));
            lines.push(match detail {
                Some(detail) => format!("{name}: {detail}"),
                None => name.to_owned(),
            });
        }
        Ok(lines)
    }

    // -- Queries --

    /// Compute the entities owning every type in `S`, bypassing the cache.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnregisteredType`] or
    /// [`DatabaseError::RepeatedQueryType`].
    pub fn query<S: ComponentSet>(&mut self) -> Result<Query<'_, S>, DatabaseError> {
        self.query_filtered::<S, ()>()
    }

    /// Like [`query`](Self::query), also rejecting entities that own any
    /// type excluded by `F`.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnregisteredType`] or
    /// [`DatabaseError::RepeatedQueryType`].
    pub fn query_filtered<S: ComponentSet, F: Filter>(
        &mut self,
    ) -> Result<Query<'_, S>, DatabaseError> {
        let plan = Plan::resolve::<S, F>(&self.registry)?;
        let matches = scan(&plan.signature, plan.driver(), &self.entities, &self.tables);
        Ok(Query::new(&mut self.tables, Cow::Owned(matches), plan))
    }

    /// The entities owning every type in `S`, memoized until a mutation
    /// touches one of those types.
    ///
    /// Results are always identical to [`query`](Self::query) at the same
    /// point in the mutation history.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnregisteredType`] or
    /// [`DatabaseError::RepeatedQueryType`].
    pub fn get_entities<S: ComponentSet>(&mut self) -> Result<Query<'_, S>, DatabaseError> {
        self.get_entities_filtered::<S, ()>()
    }

    /// Memoized form of [`query_filtered`](Self::query_filtered).
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnregisteredType`] or
    /// [`DatabaseError::RepeatedQueryType`].
    pub fn get_entities_filtered<S: ComponentSet, F: Filter>(
        &mut self,
    ) -> Result<Query<'_, S>, DatabaseError> {
        if !self.config.memoize_queries {
            return self.query_filtered::<S, F>();
        }

        let plan = Plan::resolve::<S, F>(&self.registry)?;
        let matches = self.cache.get_or_compute(&plan.signature, || {
            scan(&plan.signature, plan.driver(), &self.entities, &self.tables)
        });
        Ok(Query::new(&mut self.tables, Cow::Borrowed(matches), plan))
    }

    /// Discard every cached query result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // -- Diagnostics --

    /// A summary of the database's current size and cache behavior.
    #[must_use]
    pub fn stats(&self) -> DatabaseStats {
        let stats = DatabaseStats {
            entities: self.entities.len(),
            components: self.tables.iter().map(|table| table.len()).sum(),
            component_types: self.registry.len(),
            cached_queries: self.cache.len(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            cache_invalidations: self.cache.invalidated(),
        };
        debug!(?stats, "collected database stats");
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ecdb_component::Not;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f64,
        y: f64,
    }
    impl Component for Position {
        fn describe(&self) -> Option<String> {
            Some(format!("({}, {})", self.x, self.y))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        vx: f64,
        vy: f64,
    }
    impl Component for Velocity {}

    #[derive(Debug, Clone, PartialEq)]
    struct Collider;
    impl Component for Collider {}

    #[derive(Debug, Clone, PartialEq)]
    struct Tags(Vec<String>);
    impl Component for Tags {}

    #[derive(Debug, Clone, PartialEq)]
    struct Unregistered;
    impl Component for Unregistered {}

    fn make_db(config: DatabaseConfig) -> Database {
        let mut db = Database::with_config(config);
        db.register::<Position>().unwrap();
        db.register::<Velocity>().unwrap();
        db.register::<Collider>().unwrap();
        db.register::<Tags>().unwrap();
        db
    }

    fn pos(x: f64) -> Position {
        Position { x, y: 0.0 }
    }

    fn vel(vx: f64) -> Velocity {
        Velocity { vx, vy: 0.0 }
    }

    fn sorted(entities: &[Entity]) -> Vec<Entity> {
        let mut entities = entities.to_vec();
        entities.sort();
        entities
    }

    #[test]
    fn test_scenario() {
        let mut db = make_db(DatabaseConfig::default());
        let e1 = db.create_entity();
        db.attach(e1, Position { x: 0.0, y: 0.0 }).unwrap();
        db.attach(e1, Velocity { vx: 1.0, vy: 0.0 }).unwrap();

        let mut query = db.get_entities::<(Position, Velocity)>().unwrap();
        assert_eq!(query.entities(), &[e1]);
        query.for_each_mut(|_, (pos, _)| pos.x = 5.0);
        assert_eq!(db.get::<Position>(e1).unwrap().x, 5.0);

        let e2 = db.clone_entity(e1).unwrap();
        let query = db.get_entities::<(Position, Velocity)>().unwrap();
        assert_eq!(sorted(query.entities()), vec![e1, e2]);
        query.for_each(|_, (pos, _)| assert_eq!(pos.x, 5.0));

        db.destroy(e1).unwrap();
        let query = db.get_entities::<(Position, Velocity)>().unwrap();
        assert_eq!(query.entities(), &[e2]);
    }

    #[test]
    fn test_identity_stability() {
        let db = make_db(DatabaseConfig::default());
        assert_eq!(db.tid::<Position>(), db.tid::<Position>());
        assert_eq!(db.tid::<Position>(), Ok(Tid(0)));
        assert_eq!(db.tid::<Tags>(), Ok(Tid(3)));
        assert_ne!(db.tid::<Velocity>(), db.tid::<Collider>());
    }

    #[test]
    fn test_attach_get_round_trip() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        let stored = db.attach(e, pos(1.0)).unwrap();
        stored.y = 2.0;
        assert_eq!(db.get::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));

        db.get_mut::<Position>(e).unwrap().x = 7.0;
        assert_eq!(db.get::<Position>(e).unwrap().x, 7.0);
        assert!(db.has::<Position>(e));
        assert_eq!(db.component_count::<Position>(), 1);
    }

    #[test]
    fn test_absence() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        assert!(db.get::<Position>(e).is_none());
        assert!(db.get::<Velocity>(e).is_none());
        assert!(db.get::<Unregistered>(e).is_none());
        assert!(!db.has::<Unregistered>(e));
        assert_eq!(db.get_many::<(Position, Tags)>(e), (None, None));
        assert!(db.query::<Position>().unwrap().is_empty());
        assert!(db.get_entities::<Collider>().unwrap().is_empty());
        assert!(db.component_types(e).unwrap().is_empty());
    }

    #[test]
    fn test_contract_violations() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        let ghost = Entity(999);

        assert_eq!(
            db.register::<Position>(),
            Err(DatabaseError::AlreadyRegistered("Position"))
        );
        assert_eq!(
            db.attach(e, Unregistered).unwrap_err(),
            DatabaseError::UnregisteredType("Unregistered")
        );
        assert_eq!(
            db.attach(ghost, pos(0.0)).unwrap_err(),
            DatabaseError::NoSuchEntity(ghost)
        );
        assert_eq!(db.clone_entity(ghost), Err(DatabaseError::NoSuchEntity(ghost)));
        assert_eq!(db.destroy(ghost), Err(DatabaseError::NoSuchEntity(ghost)));
        assert!(matches!(
            db.query::<(Position, Unregistered)>(),
            Err(DatabaseError::UnregisteredType("Unregistered"))
        ));
        assert!(matches!(
            db.get_entities::<(Velocity, Position, Velocity)>(),
            Err(DatabaseError::RepeatedQueryType("Velocity"))
        ));
    }

    #[test]
    fn test_reattach_rejected_until_detached() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        db.attach(e, pos(1.0)).unwrap();
        assert_eq!(
            db.attach(e, pos(2.0)).unwrap_err(),
            DatabaseError::DuplicateComponent {
                entity: e,
                component: "Position",
            }
        );
        assert_eq!(db.get::<Position>(e).unwrap().x, 1.0);

        assert_eq!(db.detach::<Position>(e), Ok(pos(1.0)));
        assert_eq!(
            db.detach::<Position>(e),
            Err(DatabaseError::MissingComponent {
                entity: e,
                component: "Position",
            })
        );
        db.attach(e, pos(2.0)).unwrap();
        assert_eq!(db.get::<Position>(e).unwrap().x, 2.0);
        assert_eq!(db.component_count::<Position>(), 1);
    }

    #[test]
    fn test_query_matches_brute_force() {
        let mut db = make_db(DatabaseConfig::default());
        let mut owned: Vec<(Entity, [bool; 3])> = Vec::new();
        // Every combination of Position, Velocity and Collider, twice over.
        for mask in 0..16u8 {
            let e = db.create_entity();
            let flags = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0];
            if flags[0] {
                db.attach(e, pos(f64::from(mask))).unwrap();
            }
            if flags[1] {
                db.attach(e, vel(1.0)).unwrap();
            }
            if flags[2] {
                db.attach(e, Collider).unwrap();
            }
            owned.push((e, flags));
        }

        fn expect(owned: &[(Entity, [bool; 3])], pred: impl Fn(&[bool; 3]) -> bool) -> Vec<Entity> {
            owned
                .iter()
                .filter(|(_, flags)| pred(flags))
                .map(|&(e, _)| e)
                .collect()
        }

        let found = db.query_filtered::<(Position, Velocity), Not<Collider>>().unwrap();
        assert_eq!(sorted(found.entities()), expect(&owned, |f| f[0] && f[1] && !f[2]));

        let found = db.query_filtered::<Collider, Not<(Position, Velocity)>>().unwrap();
        assert_eq!(sorted(found.entities()), expect(&owned, |f| f[2] && !f[0] && !f[1]));

        let found = db.get_entities::<(Velocity, Collider, Position)>().unwrap();
        assert_eq!(sorted(found.entities()), expect(&owned, |f| f[0] && f[1] && f[2]));

        let found = db.get_entities_filtered::<Position, Not<Position>>().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_cache_transparency() {
        let mut db = make_db(DatabaseConfig::default());
        let check = |db: &mut Database| {
            let cached = sorted(
                db.get_entities_filtered::<(Position, Velocity), Not<Collider>>()
                    .unwrap()
                    .entities(),
            );
            let reversed = sorted(
                db.get_entities_filtered::<(Velocity, Position), Not<Collider>>()
                    .unwrap()
                    .entities(),
            );
            let fresh = sorted(
                db.query_filtered::<(Position, Velocity), Not<Collider>>()
                    .unwrap()
                    .entities(),
            );
            assert_eq!(cached, fresh);
            assert_eq!(reversed, fresh);
            fresh.len()
        };

        let a = db.create_entity();
        db.attach(a, pos(0.0)).unwrap();
        assert_eq!(check(&mut db), 0);
        db.attach(a, vel(1.0)).unwrap();
        assert_eq!(check(&mut db), 1);
        let b = db.clone_entity(a).unwrap();
        assert_eq!(check(&mut db), 2);
        db.attach(b, Collider).unwrap();
        assert_eq!(check(&mut db), 1);
        db.detach::<Collider>(b).unwrap();
        assert_eq!(check(&mut db), 2);
        db.detach::<Velocity>(a).unwrap();
        assert_eq!(check(&mut db), 1);
        db.destroy(b).unwrap();
        assert_eq!(check(&mut db), 0);

        // Both declared orders share one cache entry.
        let stats = db.stats();
        assert_eq!(stats.cached_queries, 1);
        assert!(stats.cache_hits > 0);
    }

    #[test]
    fn test_cached_view_sees_latest_values() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        db.attach(e, pos(0.0)).unwrap();
        db.attach(e, vel(2.0)).unwrap();

        for _ in 0..3 {
            db.get_entities::<(Velocity, Position)>()
                .unwrap()
                .for_each_mut(|_, (vel, pos)| pos.x += vel.vx);
        }
        let positions: Vec<f64> = db
            .get_entities::<Position>()
            .unwrap()
            .iter()
            .map(|(_, pos)| pos.x)
            .collect();
        assert_eq!(positions, vec![6.0]);
        assert_eq!(db.stats().cache_misses, 2);
    }

    #[test]
    fn test_clone_fidelity() {
        let mut db = make_db(DatabaseConfig::default());
        let src = db.create_entity();
        db.attach(src, pos(3.0)).unwrap();
        db.attach(src, Tags(vec!["enemy".into()])).unwrap();

        let copy = db.clone_entity(src).unwrap();
        assert_ne!(copy, src);
        assert_eq!(db.component_types(copy), db.component_types(src));
        assert_eq!(db.get::<Position>(copy), db.get::<Position>(src));

        db.get_mut::<Tags>(src).unwrap().0.push("boss".into());
        db.get_mut::<Position>(src).unwrap().x = -1.0;
        assert_eq!(db.get::<Tags>(copy), Some(&Tags(vec!["enemy".into()])));
        assert_eq!(db.get::<Position>(copy).unwrap().x, 3.0);
    }

    #[test]
    fn test_clone_of_empty_entity() {
        let mut db = make_db(DatabaseConfig::default());
        let src = db.create_entity();
        let copy = db.clone_entity(src).unwrap();
        assert!(db.contains(copy));
        assert!(db.component_types(copy).unwrap().is_empty());
    }

    #[test]
    fn test_destroy_completeness() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        let other = db.create_entity();
        db.attach(e, pos(1.0)).unwrap();
        db.attach(e, vel(1.0)).unwrap();
        db.attach(other, pos(2.0)).unwrap();
        assert_eq!(db.get_entities::<Position>().unwrap().len(), 2);

        db.destroy(e).unwrap();
        assert!(!db.contains(e));
        assert!(db.get::<Position>(e).is_none());
        assert!(db.get::<Velocity>(e).is_none());
        assert_eq!(db.entities_with::<Position>(), vec![other]);
        assert!(db.entities_with::<Velocity>().is_empty());
        assert_eq!(db.component_count::<Velocity>(), 0);
        assert_eq!(db.get_entities::<Position>().unwrap().entities(), &[other]);
        assert_eq!(
            db.attach(e, Collider).unwrap_err(),
            DatabaseError::NoSuchEntity(e)
        );
    }

    #[test]
    fn test_entity_ids_never_reused() {
        let mut db = make_db(DatabaseConfig::default());
        let mut seen = BTreeSet::new();
        for _ in 0..10 {
            let e = db.create_entity();
            assert!(seen.insert(e));
            db.destroy(e).unwrap();
        }
        let last = db.create_entity();
        assert!(seen.iter().all(|&e| e < last));
        assert_eq!(db.entity_count(), 1);
    }

    #[test]
    fn test_destroy_invalidation_policies() {
        let setup = |policy| {
            let mut db = make_db(DatabaseConfig::new().with_destroy_invalidation(policy));
            let e = db.create_entity();
            db.attach(e, pos(0.0)).unwrap();
            let c = db.create_entity();
            db.attach(c, Collider).unwrap();
            db.get_entities::<Position>().unwrap();
            db.get_entities::<Collider>().unwrap();
            db.destroy(e).unwrap();
            db
        };

        let precise = setup(DestroyInvalidation::Precise);
        assert_eq!(precise.stats().cached_queries, 1);

        let full = setup(DestroyInvalidation::FullClear);
        assert_eq!(full.stats().cached_queries, 0);
    }

    #[test]
    fn test_memoization_disabled() {
        let mut db = make_db(DatabaseConfig::new().with_memoization(false));
        let e = db.create_entity();
        db.attach(e, pos(0.0)).unwrap();
        assert_eq!(db.get_entities::<Position>().unwrap().entities(), &[e]);
        assert_eq!(db.get_entities::<Position>().unwrap().entities(), &[e]);
        let stats = db.stats();
        assert_eq!(stats.cached_queries, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[test]
    fn test_diagnostics() {
        let mut db = make_db(DatabaseConfig::default());
        let e = db.create_entity();
        db.attach(e, vel(1.0)).unwrap();
        db.attach(e, Position { x: 1.0, y: 2.0 }).unwrap();

        assert_eq!(db.component_types(e).unwrap(), vec!["Position", "Velocity"]);
        assert_eq!(db.describe(e).unwrap(), vec!["Position: (1, 2)", "Velocity"]);

        let stats = db.stats();
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.components, 2);
        assert_eq!(stats.component_types, 4);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["components"], 2);
    }
}

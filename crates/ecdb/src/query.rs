//! Query engine: finds entities matching a [`Signature`].
//!
//! A scan is driven by the table of the *first* required type in declared
//! order: every component in that table is visited once, and its owner's
//! entity row is checked for the remaining required and excluded types.
//! Cost is `|driving table| × (number of other terms)`, independent of the
//! total entity count, so callers should list their most selective type first.
//!
//! Results are materialized as a [`MatchSet`]: the matching entities plus,
//! per entity, the [`Cid`] of each required component in canonical column
//! order. A [`Query`] view re-orders those columns into the caller's declared
//! order and resolves them to references on demand, so a memoized match set
//! never holds stale values, only locations.

use std::borrow::Cow;
use std::marker::PhantomData;

use ecdb_component::{Cid, ComponentSet, Entity, Filter, Signature, TableStore, Tid};

use crate::entity_table::EntityTable;
use crate::error::DatabaseError;
use crate::registry::TypeRegistry;

/// The materialized result of a query.
///
/// Rows are stored flat: row `i` owns `cids[i * width..(i + 1) * width]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    entities: Vec<Entity>,
    cids: Vec<Cid>,
    width: usize,
}

impl MatchSet {
    /// Create an empty set whose rows hold `width` component locations.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            entities: Vec::new(),
            cids: Vec::new(),
            width,
        }
    }

    /// Append a matching entity and its component locations.
    pub fn push(&mut self, entity: Entity, cids: &[Cid]) {
        debug_assert_eq!(cids.len(), self.width);
        self.entities.push(entity);
        self.cids.extend_from_slice(cids);
    }

    /// Returns the number of matching entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The matching entities in scan order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The component locations of row `index`, in canonical column order.
    #[must_use]
    pub fn row(&self, index: usize) -> &[Cid] {
        let start = index * self.width;
        self.cids.get(start..start + self.width).unwrap_or(&[])
    }
}

/// A query resolved against a registry.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    /// The cache key.
    pub(crate) signature: Signature,
    /// Required types in declared order; the first drives the scan.
    declared: Vec<Tid>,
    /// Canonical column of each declared type.
    columns: Vec<usize>,
}

impl Plan {
    /// Resolve the required set `S` and exclusions `F`.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnregisteredType`] if any type is unknown and
    /// [`DatabaseError::RepeatedQueryType`] if a required type repeats.
    pub(crate) fn resolve<S: ComponentSet, F: Filter>(
        registry: &TypeRegistry,
    ) -> Result<Self, DatabaseError> {
        let declared = S::keys()
            .into_iter()
            .map(|key| registry.resolve(key))
            .collect::<Result<Vec<_>, _>>()?;
        let excluded = F::keys()
            .into_iter()
            .map(|key| registry.resolve(key))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(tid) = Signature::repeated(&declared) {
            return Err(DatabaseError::RepeatedQueryType(registry.name(tid)));
        }

        let signature = Signature::new(&declared, &excluded);
        let columns = declared
            .iter()
            .map(|&tid| signature.column_of(tid).unwrap_or_default())
            .collect();

        Ok(Self {
            signature,
            declared,
            columns,
        })
    }

    /// The table that drives the scan.
    pub(crate) fn driver(&self) -> Option<Tid> {
        self.declared.first().copied()
    }
}

/// Compute the match set of `signature` from scratch, driven by `driver`.
pub(crate) fn scan(
    signature: &Signature,
    driver: Option<Tid>,
    entities: &EntityTable,
    tables: &TableStore,
) -> MatchSet {
    let mut matches = MatchSet::new(signature.include().len());
    let Some(table) = driver.and_then(|tid| tables.get(tid)) else {
        return matches;
    };
    let driver = table.tid();

    let mut row_cids = Vec::with_capacity(signature.include().len());
    'components: for (cid, owner) in table.entries() {
        let Some(row) = entities.row(owner) else {
            continue;
        };

        row_cids.clear();
        for &tid in signature.include() {
            let found = if tid == driver { Some(cid) } else { row.get(tid) };
            match found {
                Some(found) => row_cids.push(found),
                None => continue 'components,
            }
        }
        if signature.exclude().iter().any(|&tid| row.has(tid)) {
            continue;
        }

        matches.push(owner, &row_cids);
    }
    matches
}

/// A view over the entities matching a query, borrowed from a database.
///
/// Obtained from [`Database::query`](crate::Database::query) (computed fresh)
/// or [`Database::get_entities`](crate::Database::get_entities) (memoized).
/// Component values are resolved when iterated, so mutations made through
/// [`Query::for_each_mut`] are visible to every later read.
pub struct Query<'db, S: ComponentSet> {
    tables: &'db mut TableStore,
    matches: Cow<'db, MatchSet>,
    plan: Plan,
    _marker: PhantomData<fn() -> S>,
}

impl<'db, S: ComponentSet> Query<'db, S> {
    pub(crate) fn new(
        tables: &'db mut TableStore,
        matches: Cow<'db, MatchSet>,
        plan: Plan,
    ) -> Self {
        Self {
            tables,
            matches,
            plan,
            _marker: PhantomData,
        }
    }

    /// Returns the number of matching entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns `true` if no entity matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The matching entities. The order is unspecified.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.matches.entities()
    }

    /// Returns `true` if `entity` is in the result.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.matches.entities().contains(&entity)
    }

    /// The canonical signature this query was resolved to.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.plan.signature
    }

    /// Iterate over `(entity, components)` with shared access.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, S::Ref<'_>)> + '_ {
        let tables: &TableStore = &*self.tables;
        let plan = &self.plan;
        let matches = &*self.matches;
        matches
            .entities()
            .iter()
            .enumerate()
            .filter_map(move |(i, &entity)| {
                let row = matches.row(i);
                let item = S::fetch(tables, |k| {
                    Some((*plan.declared.get(k)?, *row.get(*plan.columns.get(k)?)?))
                })?;
                Some((entity, item))
            })
    }

    /// Call `f` with shared access to each match.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(Entity, S::Ref<'_>),
    {
        for (entity, item) in self.iter() {
            f(entity, item);
        }
    }

    /// Call `f` with exclusive access to each match, mutating in place.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(Entity, S::Mut<'_>),
    {
        // Resolved plans name installed, pairwise distinct tables.
        let Some(mut extracted) = S::extract(&mut *self.tables, &self.plan.declared) else {
            return;
        };

        let columns = &self.plan.columns;
        for (i, &entity) in self.matches.entities().iter().enumerate() {
            let row = self.matches.row(i);
            let item = S::fetch_mut(&mut extracted, |k| row[columns[k]]);
            if let Some(item) = item {
                f(entity, item);
            }
        }

        S::restore(extracted, &mut *self.tables);
    }
}

impl<S: ComponentSet> std::fmt::Debug for Query<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("signature", &self.plan.signature)
            .field("entities", &self.matches.entities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use ecdb_component::{Component, ComponentTable, Not};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    #[derive(Debug, Clone, PartialEq)]
    struct Solid;
    impl Component for Solid {}

    struct Fixture {
        registry: TypeRegistry,
        entities: EntityTable,
        tables: TableStore,
        next_cid: u64,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = TypeRegistry::new();
            let mut tables = TableStore::new();
            let p = registry.register::<Position>().unwrap();
            tables.install(Box::new(ComponentTable::<Position>::new(p)));
            let v = registry.register::<Velocity>().unwrap();
            tables.install(Box::new(ComponentTable::<Velocity>::new(v)));
            let s = registry.register::<Solid>().unwrap();
            tables.install(Box::new(ComponentTable::<Solid>::new(s)));
            Self {
                registry,
                entities: EntityTable::default(),
                tables,
                next_cid: 0,
            }
        }

        fn add<T: Component>(&mut self, entity: Entity, value: T) {
            if !self.entities.contains(entity) {
                self.entities.insert(entity);
            }
            self.next_cid += 1;
            let cid = Cid(self.next_cid);
            let tid = self.registry.tid::<T>().unwrap();
            self.tables.typed_mut::<T>(tid).unwrap().insert(cid, entity, value);
            self.entities.row_mut(entity).unwrap().insert(tid, cid);
        }

        fn run<S: ComponentSet, F: Filter>(&self) -> Vec<Entity> {
            let plan = Plan::resolve::<S, F>(&self.registry).unwrap();
            let matches = scan(&plan.signature, plan.driver(), &self.entities, &self.tables);
            let mut found = matches.entities().to_vec();
            found.sort();
            found
        }
    }

    #[test]
    fn test_match_set_rows() {
        let mut set = MatchSet::new(2);
        set.push(Entity(1), &[Cid(10), Cid(11)]);
        set.push(Entity(2), &[Cid(20), Cid(21)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.row(1), &[Cid(20), Cid(21)]);
        assert_eq!(set.row(5), &[] as &[Cid]);
    }

    #[test]
    fn test_plan_columns_follow_canonical_order() {
        let fixture = Fixture::new();
        let plan = Plan::resolve::<(Velocity, Position), ()>(&fixture.registry).unwrap();
        assert_eq!(plan.signature.include(), &[Tid(0), Tid(1)]);
        assert_eq!(plan.declared, vec![Tid(1), Tid(0)]);
        assert_eq!(plan.columns, vec![1, 0]);
        assert_eq!(plan.driver(), Some(Tid(1)));
    }

    #[test]
    fn test_plan_rejects_repeats_and_unknown_types() {
        #[derive(Debug, Clone)]
        struct Unknown;
        impl Component for Unknown {}

        let fixture = Fixture::new();
        assert_eq!(
            Plan::resolve::<(Position, Position), ()>(&fixture.registry).unwrap_err(),
            DatabaseError::RepeatedQueryType("Position")
        );
        assert_eq!(
            Plan::resolve::<Position, Not<Unknown>>(&fixture.registry).unwrap_err(),
            DatabaseError::UnregisteredType("Unknown")
        );
    }

    #[test]
    fn test_scan_required_and_excluded() {
        let mut fixture = Fixture::new();
        fixture.add(Entity(1), Position(0));
        fixture.add(Entity(1), Velocity(1));
        fixture.add(Entity(2), Position(0));
        fixture.add(Entity(3), Position(0));
        fixture.add(Entity(3), Velocity(1));
        fixture.add(Entity(3), Solid);
        fixture.add(Entity(4), Velocity(2));

        assert_eq!(
            fixture.run::<Position, ()>(),
            vec![Entity(1), Entity(2), Entity(3)]
        );
        assert_eq!(fixture.run::<(Position, Velocity), ()>(), vec![Entity(1), Entity(3)]);
        assert_eq!(fixture.run::<(Velocity, Position), ()>(), vec![Entity(1), Entity(3)]);
        assert_eq!(
            fixture.run::<(Position, Velocity), Not<Solid>>(),
            vec![Entity(1)]
        );
        assert_eq!(
            fixture.run::<Velocity, Not<(Position, Solid)>>(),
            vec![Entity(4)]
        );
        assert!(fixture.run::<Position, Not<Position>>().is_empty());
    }

    #[test]
    fn test_scan_unused_type_is_empty() {
        let mut fixture = Fixture::new();
        fixture.add(Entity(1), Position(0));
        assert!(fixture.run::<Solid, ()>().is_empty());
        assert!(fixture.run::<(Solid, Position), ()>().is_empty());
    }

    #[test]
    fn test_scan_stores_canonical_columns() {
        let mut fixture = Fixture::new();
        fixture.add(Entity(1), Position(0)); // Cid(1)
        fixture.add(Entity(1), Velocity(1)); // Cid(2)

        let plan = Plan::resolve::<(Velocity, Position), ()>(&fixture.registry).unwrap();
        let matches = scan(&plan.signature, plan.driver(), &fixture.entities, &fixture.tables);
        assert_eq!(matches.row(0), &[Cid(1), Cid(2)]);
    }

    #[test]
    fn test_query_view_reorders_to_declared_order() {
        let mut fixture = Fixture::new();
        fixture.add(Entity(1), Position(3));
        fixture.add(Entity(1), Velocity(4));

        let plan = Plan::resolve::<(Velocity, Position), ()>(&fixture.registry).unwrap();
        let matches = scan(&plan.signature, plan.driver(), &fixture.entities, &fixture.tables);
        let mut query =
            Query::<(Velocity, Position)>::new(&mut fixture.tables, Cow::Owned(matches), plan);

        let rows: Vec<_> = query.iter().map(|(e, (v, p))| (e, v.0, p.0)).collect();
        assert_eq!(rows, vec![(Entity(1), 4, 3)]);

        query.for_each_mut(|_, (vel, pos)| pos.0 += vel.0);
        query.for_each(|_, (_, pos)| assert_eq!(pos.0, 7));
        assert!(query.contains(Entity(1)));
        assert_eq!(query.len(), 1);
    }
}

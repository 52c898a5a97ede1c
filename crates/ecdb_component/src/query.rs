//! Declarative query parameters.
//!
//! A query names the component types an entity must own, as a
//! [`ComponentSet`], and optionally the types it must not own, as a
//! [`Filter`]:
//!
//! ```text
//! (Position, Velocity)                    must own Position and Velocity
//! Position, Not<Velocity>                 must own Position, must not own Velocity
//! (Position, Sprite), Not<(Hidden, Dead)> must own both, must own neither Hidden nor Dead
//! ```
//!
//! A `ComponentSet` is a single component type or a tuple of up to eight
//! component types. It also knows how to borrow its components out of a
//! [`TableStore`], both shared and exclusively. Exclusive borrows take each
//! table out of the store for the duration of the borrow, so the borrow
//! checker can see that distinct tables never alias.

use std::marker::PhantomData;

use crate::component::{Component, ComponentKey, Tid};
use crate::entity::Cid;
use crate::table::{ComponentTable, TableStore};

/// A set of required component types.
///
/// Implemented for every `T: Component` and for tuples of components.
/// Element `i` of the set is addressed by position `i` in the closures below.
pub trait ComponentSet: 'static {
    /// Shared references to one entity's components.
    type Ref<'a>;
    /// Exclusive references to one entity's components.
    type Mut<'a>;
    /// Optional shared references, one per element.
    type Opt<'a>;
    /// The typed tables, taken out of the store.
    type Tables;

    /// The component keys of the set, in declared order.
    fn keys() -> Vec<ComponentKey>;

    /// Look up each element; `locate(i)` gives the table and slot of element `i`.
    fn lookup<'a>(
        store: &'a TableStore,
        locate: impl Fn(usize) -> Option<(Tid, Cid)>,
    ) -> Self::Opt<'a>;

    /// Like [`ComponentSet::lookup`], but all elements must be present.
    fn fetch<'a>(
        store: &'a TableStore,
        locate: impl Fn(usize) -> Option<(Tid, Cid)>,
    ) -> Option<Self::Ref<'a>>;

    /// Take the tables of every element out of the store.
    ///
    /// `tids[i]` is the table of element `i`. On failure nothing stays
    /// extracted.
    fn extract(store: &mut TableStore, tids: &[Tid]) -> Option<Self::Tables>;

    /// Hand extracted tables back to the store.
    fn restore(tables: Self::Tables, store: &mut TableStore);

    /// Borrow one entity's components from extracted tables; `cid(i)` is the
    /// slot of element `i`.
    fn fetch_mut<'a>(
        tables: &'a mut Self::Tables,
        cid: impl Fn(usize) -> Cid,
    ) -> Option<Self::Mut<'a>>;
}

impl<T: Component> ComponentSet for T {
    type Ref<'a> = &'a T;
    type Mut<'a> = &'a mut T;
    type Opt<'a> = Option<&'a T>;
    type Tables = Box<ComponentTable<T>>;

    fn keys() -> Vec<ComponentKey> {
        vec![ComponentKey::of::<T>()]
    }

    fn lookup<'a>(
        store: &'a TableStore,
        locate: impl Fn(usize) -> Option<(Tid, Cid)>,
    ) -> Self::Opt<'a> {
        let (tid, cid) = locate(0)?;
        store.typed::<T>(tid)?.get(cid)
    }

    fn fetch<'a>(
        store: &'a TableStore,
        locate: impl Fn(usize) -> Option<(Tid, Cid)>,
    ) -> Option<Self::Ref<'a>> {
        Self::lookup(store, locate)
    }

    fn extract(store: &mut TableStore, tids: &[Tid]) -> Option<Self::Tables> {
        store.extract::<T>(*tids.first()?)
    }

    fn restore(tables: Self::Tables, store: &mut TableStore) {
        store.restore(tables);
    }

    fn fetch_mut<'a>(
        tables: &'a mut Self::Tables,
        cid: impl Fn(usize) -> Cid,
    ) -> Option<Self::Mut<'a>> {
        tables.get_mut(cid(0))
    }
}

macro_rules! impl_component_set {
    ($(($T:ident, $var:ident, $idx:tt)),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            type Ref<'a> = ($(&'a $T,)+);
            type Mut<'a> = ($(&'a mut $T,)+);
            type Opt<'a> = ($(Option<&'a $T>,)+);
            type Tables = ($(Box<ComponentTable<$T>>,)+);

            fn keys() -> Vec<ComponentKey> {
                vec![$(ComponentKey::of::<$T>()),+]
            }

            fn lookup<'a>(
                store: &'a TableStore,
                locate: impl Fn(usize) -> Option<(Tid, Cid)>,
            ) -> Self::Opt<'a> {
                ($(
                    locate($idx).and_then(|(tid, cid)| store.typed::<$T>(tid)?.get(cid)),
                )+)
            }

            fn fetch<'a>(
                store: &'a TableStore,
                locate: impl Fn(usize) -> Option<(Tid, Cid)>,
            ) -> Option<Self::Ref<'a>> {
                let ($($var,)+) = Self::lookup(store, locate);
                Some(($($var?,)+))
            }

            fn extract(store: &mut TableStore, tids: &[Tid]) -> Option<Self::Tables> {
                let ($($var,)+) = ($(*tids.get($idx)?,)+);
                let ($($var,)+) = ($(store.extract::<$T>($var),)+);
                match ($($var,)+) {
                    ($(Some($var),)+) => Some(($($var,)+)),
                    ($($var,)+) => {
                        $(
                            if let Some(table) = $var {
                                store.restore(table);
                            }
                        )+
                        None
                    }
                }
            }

            fn restore(tables: Self::Tables, store: &mut TableStore) {
                let ($($var,)+) = tables;
                $(store.restore($var);)+
            }

            fn fetch_mut<'a>(
                tables: &'a mut Self::Tables,
                cid: impl Fn(usize) -> Cid,
            ) -> Option<Self::Mut<'a>> {
                let ($($var,)+) = tables;
                Some(($($var.get_mut(cid($idx))?,)+))
            }
        }
    };
}

impl_component_set!((A, a, 0));
impl_component_set!((A, a, 0), (B, b, 1));
impl_component_set!((A, a, 0), (B, b, 1), (C, c, 2));
impl_component_set!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3));
impl_component_set!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3), (E, e, 4));
impl_component_set!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3), (E, e, 4), (F, f, 5));
impl_component_set!(
    (A, a, 0),
    (B, b, 1),
    (C, c, 2),
    (D, d, 3),
    (E, e, 4),
    (F, f, 5),
    (G, g, 6)
);
impl_component_set!(
    (A, a, 0),
    (B, b, 1),
    (C, c, 2),
    (D, d, 3),
    (E, e, 4),
    (F, f, 5),
    (G, g, 6),
    (H, h, 7)
);

/// The excluded component types of a query.
///
/// `()` excludes nothing; [`Not<S>`] excludes every type in `S`.
pub trait Filter: 'static {
    /// The component keys an entity must not own.
    fn keys() -> Vec<ComponentKey>;
}

impl Filter for () {
    fn keys() -> Vec<ComponentKey> {
        Vec::new()
    }
}

/// Exclusion tag: matches only entities owning none of the types in `S`.
///
/// `Not<Solid>` excludes one type, `Not<(Solid, Hidden)>` excludes both.
pub struct Not<S: ComponentSet>(PhantomData<fn() -> S>);

impl<S: ComponentSet> Filter for Not<S> {
    fn keys() -> Vec<ComponentKey> {
        S::keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[derive(Debug, Clone, PartialEq)]
    struct Position(f64);
    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity(f64);
    impl Component for Velocity {}

    #[derive(Debug, Clone, PartialEq)]
    struct Solid;
    impl Component for Solid {}

    fn make_store() -> TableStore {
        let mut positions = ComponentTable::<Position>::new(Tid(0));
        positions.insert(Cid(1), Entity(1), Position(1.0));
        let mut velocities = ComponentTable::<Velocity>::new(Tid(1));
        velocities.insert(Cid(2), Entity(1), Velocity(0.5));

        let mut store = TableStore::new();
        store.install(Box::new(positions));
        store.install(Box::new(velocities));
        store
    }

    #[test]
    fn test_keys_follow_declared_order() {
        let keys = <(Velocity, Position)>::keys();
        assert_eq!(keys, vec![ComponentKey::of::<Velocity>(), ComponentKey::of::<Position>()]);
        assert_eq!(<Not<(Solid, Velocity)>>::keys().len(), 2);
        assert!(<()>::keys().is_empty());
    }

    #[test]
    fn test_lookup_reports_each_element() {
        let store = make_store();
        let (pos, vel) = <(Position, Velocity)>::lookup(&store, |i| match i {
            0 => Some((Tid(0), Cid(1))),
            _ => None,
        });
        assert_eq!(pos, Some(&Position(1.0)));
        assert_eq!(vel, None);
    }

    #[test]
    fn test_fetch_requires_every_element() {
        let store = make_store();
        let both = |i: usize| Some((Tid(i as u32), Cid(i as u64 + 1)));
        let (pos, vel) = <(Position, Velocity)>::fetch(&store, both).unwrap();
        assert_eq!((pos.0, vel.0), (1.0, 0.5));

        let missing = |i: usize| (i == 0).then_some((Tid(0), Cid(1)));
        assert!(<(Position, Velocity)>::fetch(&store, missing).is_none());
    }

    #[test]
    fn test_fetch_mut_through_extracted_tables() {
        let mut store = make_store();
        let mut tables = <(Velocity, Position)>::extract(&mut store, &[Tid(1), Tid(0)]).unwrap();
        {
            let (vel, pos) = <(Velocity, Position)>::fetch_mut(&mut tables, |i| Cid(2 - i as u64))
                .unwrap();
            pos.0 += vel.0;
        }
        <(Velocity, Position)>::restore(tables, &mut store);
        assert_eq!(store.typed::<Position>(Tid(0)).unwrap().get(Cid(1)), Some(&Position(1.5)));
    }

    #[test]
    fn test_failed_extract_restores_partial_tables() {
        let mut store = make_store();
        // The same table twice cannot be extracted.
        assert!(<(Position, Position)>::extract(&mut store, &[Tid(0), Tid(0)]).is_none());
        assert!(store.get(Tid(0)).is_some());
        // A table of the wrong type cannot be extracted either.
        assert!(<(Position, Solid)>::extract(&mut store, &[Tid(0), Tid(1)]).is_none());
        assert!(store.get(Tid(0)).is_some());
        assert!(store.get(Tid(1)).is_some());
    }
}

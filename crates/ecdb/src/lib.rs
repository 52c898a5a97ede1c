//! # ecdb
//!
//! An in-memory entity-component database for game simulations.
//!
//! Entities are opaque handles; data lives in typed components attached to
//! them. Component types are registered once, each gets its own table, and
//! queries select the entities that own a set of component types and none of
//! an excluded set.
//!
//! This crate provides:
//!
//! - [`Database`]: entity lifecycle, component attach/detach/get and queries.
//! - [`Query`]: a view over a query result, iterated shared or mutably.
//! - [`QueryCache`]: memoized results with per-type invalidation.
//! - [`TypeRegistry`]: component type identifiers.
//! - [`DatabaseConfig`], [`DatabaseStats`], [`DatabaseError`].
//!
//! The storage primitives are re-exported from `ecdb_component`.

pub mod cache;
pub mod config;
pub mod database;
pub mod entity_table;
pub mod error;
pub mod query;
pub mod registry;

pub use cache::QueryCache;
pub use config::{DatabaseConfig, DestroyInvalidation};
pub use database::{Database, DatabaseStats};
pub use entity_table::{EntityRow, EntityTable};
pub use error::DatabaseError;
pub use query::{MatchSet, Query};
pub use registry::TypeRegistry;

pub use ecdb_component::{
    Cid, Component, ComponentInfo, ComponentKey, ComponentSet, Entity, Filter, Not, Signature,
    Tid,
};

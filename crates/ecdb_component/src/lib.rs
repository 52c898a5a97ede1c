//! # ecdb_component
//!
//! Storage primitives of the entity-component database: what a component is,
//! how entities and component instances are named, and how the values of one
//! component type are stored.
//!
//! This crate provides:
//!
//! - [`Component`] trait: the contract all stored data must satisfy.
//! - [`Tid`], [`ComponentKey`], [`ComponentInfo`]: component type identity.
//! - [`Entity`], [`Cid`] and their monotonic allocators.
//! - [`ComponentTable`]: per-type storage, erased as [`ErasedTable`] inside a
//!   [`TableStore`].
//! - [`ComponentSet`], [`Filter`], [`Not`]: declarative query parameters.
//! - [`Signature`]: the canonical key of a query.

pub mod component;
pub mod entity;
pub mod query;
pub mod signature;
pub mod table;

pub use component::{Component, ComponentInfo, ComponentKey, Tid};
pub use entity::{Cid, CidAllocator, Entity, EntityAllocator};
pub use query::{ComponentSet, Filter, Not};
pub use signature::Signature;
pub use table::{ComponentTable, ErasedTable, Slot, TableStore};

//! Database error types.
//!
//! Every variant is a caller contract violation. Absence of a component or an
//! empty query result is never reported through this type.

use ecdb_component::Entity;

/// Errors returned by [`Database`](crate::Database) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// The entity was never created or has been destroyed.
    #[error("{0} does not exist")]
    NoSuchEntity(Entity),

    /// A component type was used before being registered.
    #[error("component type `{0}` is not registered")]
    UnregisteredType(&'static str),

    /// A component type was registered twice.
    #[error("component type `{0}` is already registered")]
    AlreadyRegistered(&'static str),

    /// The entity already owns a component of this type.
    #[error("{entity} already has a `{component}` component")]
    DuplicateComponent {
        /// The target entity.
        entity: Entity,
        /// The component type name.
        component: &'static str,
    },

    /// The entity owns no component of this type.
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        /// The target entity.
        entity: Entity,
        /// The component type name.
        component: &'static str,
    },

    /// A query listed the same required type more than once.
    #[error("query requires component type `{0}` more than once")]
    RepeatedQueryType(&'static str),
}

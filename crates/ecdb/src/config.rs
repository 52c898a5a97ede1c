//! Database configuration.

use serde::{Deserialize, Serialize};

/// How destroying an entity invalidates cached queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyInvalidation {
    /// Drop only the signatures that mention a type the entity owned.
    #[default]
    Precise,
    /// Drop every cached signature.
    FullClear,
}

/// Tuning knobs for a [`Database`](crate::Database).
///
/// None of these change query results; they only trade memory for time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Cache invalidation policy for entity destruction.
    pub destroy_invalidation: DestroyInvalidation,
    /// Whether `get_entities` memoizes its results.
    pub memoize_queries: bool,
    /// Initial capacity of the entity table.
    pub entity_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            destroy_invalidation: DestroyInvalidation::Precise,
            memoize_queries: true,
            entity_capacity: 0,
        }
    }
}

impl DatabaseConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the destroy invalidation policy.
    #[must_use]
    pub fn with_destroy_invalidation(mut self, policy: DestroyInvalidation) -> Self {
        self.destroy_invalidation = policy;
        self
    }

    /// Enable or disable query memoization.
    #[must_use]
    pub fn with_memoization(mut self, enabled: bool) -> Self {
        self.memoize_queries = enabled;
        self
    }

    /// Reserve room for `capacity` entities up front.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.destroy_invalidation, DestroyInvalidation::Precise);
        assert!(config.memoize_queries);
        assert_eq!(config.entity_capacity, 0);
    }

    #[test]
    fn test_builder() {
        let config = DatabaseConfig::new()
            .with_destroy_invalidation(DestroyInvalidation::FullClear)
            .with_memoization(false)
            .with_entity_capacity(128);
        assert_eq!(config.destroy_invalidation, DestroyInvalidation::FullClear);
        assert!(!config.memoize_queries);
        assert_eq!(config.entity_capacity, 128);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{ "destroy_invalidation": "full_clear" }"#).unwrap();
        assert_eq!(config.destroy_invalidation, DestroyInvalidation::FullClear);
        assert!(config.memoize_queries);
    }
}

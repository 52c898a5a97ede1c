//! Demo configuration.
//!
//! Defaults are built in. A JSON file named by `ECDB_DEMO_CONFIG` overrides
//! any subset of the fields:
//!
//! ```json
//! {
//!   "tick": { "tick_rate": 120.0, "max_ticks": 600 },
//!   "database": { "destroy_invalidation": "full_clear" },
//!   "walkers": 12
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, ensure};
use ecdb::DatabaseConfig;
use serde::{Deserialize, Serialize};

use crate::sprites::SpriteSheets;
use crate::tick::TickConfig;

/// Environment variable naming the optional JSON config file.
pub const CONFIG_ENV: &str = "ECDB_DEMO_CONFIG";

/// Configuration for the whole demo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub tick: TickConfig,
    pub database: DatabaseConfig,
    /// Number of walkers placed in the level.
    pub walkers: usize,
    /// Downward acceleration per tick.
    pub gravity: f64,
    /// Spawn a walker from the template every `spawn_interval` ticks (0 = never).
    pub spawn_interval: u64,
    /// Ticks a spawned walker lives.
    pub spawn_lifetime: u64,
    pub sprites: SpriteSheets,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig {
                tick_rate: 60.0,
                max_ticks: 300,
            },
            database: DatabaseConfig::default(),
            walkers: 4,
            gravity: 0.5,
            spawn_interval: 30,
            spawn_lifetime: 90,
            sprites: SpriteSheets::default(),
        }
    }
}

impl DemoConfig {
    /// Load the file named by [`CONFIG_ENV`], or the defaults if it is unset.
    ///
    /// # Errors
    ///
    /// Fails if the variable is set but the file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Read a config file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid config JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parse a config from JSON text. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if `text` is not valid config JSON or names an unusable tick rate.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot.
    ///
    /// # Errors
    ///
    /// Fails unless the tick rate is a finite, positive number.
    pub fn validate(&self) -> Result<()> {
        let rate = self.tick.tick_rate;
        ensure!(
            rate.is_finite() && rate > 0.0,
            "tick_rate must be a positive number of ticks per second, got {rate}"
        );
        Ok(())
    }
}

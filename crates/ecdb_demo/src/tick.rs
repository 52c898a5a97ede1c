//! Fixed-timestep simulation loop.
//!
//! Every tick runs the passes in order:
//!
//! 1. AI: steer from last tick's senses.
//! 2. Physics: integrate movers.
//! 3. Collision: resolve against statics, refresh senses.
//! 4. Render: advance animations, collect draw calls.
//! 5. Lifetime: destroy expired entities.
//! 6. Spawn: clone due spawner templates.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ecdb::{Database, DatabaseStats};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::register_all;
use crate::config::DemoConfig;
use crate::level::{self, Level};
use crate::passes;

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick_id: u64,
    pub thinking: usize,
    pub moving: usize,
    pub contacts: usize,
    pub drawn: usize,
    pub destroyed: usize,
    pub spawned: usize,
}

/// The simulation state and its loop.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: DemoConfig,
    db: Database,
    level: Level,
}

impl TickLoop {
    /// Create the database, register the demo components and build the level.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid or the level cannot be populated.
    pub fn new(config: DemoConfig) -> Result<Self> {
        config.validate()?;
        let mut db = Database::with_config(config.database.clone());
        register_all(&mut db).context("registering demo components")?;
        let level = level::build(&mut db, &config).context("building the level")?;
        Ok(Self {
            tick_id: 0,
            config,
            db,
            level,
        })
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the database.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Returns the named entities of the level.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Run one tick of the simulation.
    ///
    /// # Errors
    ///
    /// Propagates any database error raised by a pass.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick_id += 1;
        let db = &mut self.db;

        let thinking = passes::ai(db)?;
        let moving = passes::physics(db, self.config.gravity)?;
        let contacts = passes::collision(db)?.len();
        let drawn = passes::render(db, &self.config.sprites)?.len();
        let destroyed = passes::lifetime(db)?.len();
        let spawned = passes::spawn(db, self.tick_id)?.len();

        let report = TickReport {
            tick_id: self.tick_id,
            thinking,
            moving,
            contacts,
            drawn,
            destroyed,
            spawned,
        };
        debug!(
            tick_id = self.tick_id,
            moving,
            contacts,
            drawn,
            destroyed,
            spawned,
            "tick complete"
        );
        Ok(report)
    }

    /// Run the loop for the configured number of ticks, or indefinitely.
    ///
    /// # Errors
    ///
    /// Stops at the first tick that fails.
    pub fn run(&mut self) -> Result<DatabaseStats> {
        let tick = &self.config.tick;
        let tick_duration = Duration::from_secs_f64(1.0 / tick.tick_rate);
        let max_ticks = tick.max_ticks;
        let mut tick_count = 0u64;

        info!(tick_rate = tick.tick_rate, max_ticks, "starting tick loop");

        loop {
            let start = Instant::now();

            self.tick().with_context(|| format!("tick {}", self.tick_id))?;

            tick_count += 1;
            if max_ticks > 0 && tick_count >= max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }

        Ok(self.db.stats())
    }
}

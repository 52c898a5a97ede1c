//! # ecdb_demo: platformer simulation
//!
//! Drives the entity-component database the way a game loop does: every tick
//! it runs the AI, physics, collision and render passes as cached queries,
//! spawns walkers by cloning a template entity and destroys them when their
//! lifetime runs out.
//!
//! ## Startup Sequence
//!
//! 1. Load [`DemoConfig`] from the file named by `ECDB_DEMO_CONFIG`, if set.
//! 2. Register the demo components and build the level.
//! 3. Run the fixed-timestep tick loop, then log the database stats as JSON.

mod components;
mod config;
mod level;
mod passes;
mod sprites;
mod tick;

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::DemoConfig;
use tick::TickLoop;

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ecdb_demo=info".parse()?))
        .init();

    let config = DemoConfig::load()?;
    info!(
        walkers = config.walkers,
        max_ticks = config.tick.max_ticks,
        invalidation = ?config.database.destroy_invalidation,
        "ecdb demo starting"
    );

    let mut tick_loop = TickLoop::new(config)?;
    let level = serde_json::to_string(tick_loop.level())?;
    debug!(%level, "level entities");

    let stats = tick_loop.run()?;

    let hopper = tick_loop.db().describe(tick_loop.level().hopper)?;
    debug!(?hopper, "hopper final state");

    let stats = serde_json::to_string(&stats)?;
    info!(ticks = tick_loop.tick_id(), %stats, "ecdb demo finished");
    Ok(())
}

//! The demo level: a floor between two walls, a row of walkers, one hopper
//! and a spawner template hanging above the floor.

use ecdb::{Database, DatabaseError, Entity};
use glam::DVec2;
use serde::Serialize;
use tracing::info;

use crate::components::{Ai, Brain, Collider, Position, Spawner, Sprite, Velocity};
use crate::config::DemoConfig;

pub const FLOOR_WIDTH: f64 = 64.0;
pub const WALKER_SPEED: f64 = 0.25;
pub const WALKER_FRICTION: f64 = 0.1;

/// Entities the simulation refers to by name.
#[derive(Debug, Clone, Serialize)]
pub struct Level {
    pub floor: Entity,
    pub walls: [Entity; 2],
    pub walkers: Vec<Entity>,
    pub hopper: Entity,
    pub template: Entity,
}

/// A static block: collides, never moves.
fn block(db: &mut Database, centre: DVec2, size: DVec2) -> Result<Entity, DatabaseError> {
    let entity = db.create_entity();
    db.attach(entity, Position(centre))?;
    db.attach(entity, Collider::new(size.x, size.y))?;
    db.attach(entity, Sprite::new("block", "idle"))?;
    Ok(entity)
}

/// A walker heading in `dir`.
pub fn walker(db: &mut Database, at: DVec2, dir: i8) -> Result<Entity, DatabaseError> {
    let entity = db.create_entity();
    db.attach(entity, Position(at))?;
    let velocity = DVec2::new(f64::from(dir) * WALKER_SPEED, 0.0);
    db.attach(entity, Velocity::new(velocity).with_friction(WALKER_FRICTION))?;
    db.attach(entity, Collider::new(1.0, 1.0))?;
    db.attach(entity, Sprite::new("walker", "walk"))?;
    db.attach(entity, Ai::new(Brain::Walker { dir }))?;
    Ok(entity)
}

/// Populate `db` with the demo level. Component types must be registered.
///
/// # Errors
///
/// Propagates database errors, which only occur if a type is unregistered.
pub fn build(db: &mut Database, config: &DemoConfig) -> Result<Level, DatabaseError> {
    let half = FLOOR_WIDTH / 2.0;
    let floor = block(db, DVec2::new(0.0, -0.5), DVec2::new(FLOOR_WIDTH, 1.0))?;
    let walls = [
        block(db, DVec2::new(-half - 0.5, 4.0), DVec2::new(1.0, 10.0))?,
        block(db, DVec2::new(half + 0.5, 4.0), DVec2::new(1.0, 10.0))?,
    ];

    let spacing = FLOOR_WIDTH / (config.walkers as f64 + 1.0);
    let mut walkers = Vec::with_capacity(config.walkers);
    for i in 0..config.walkers {
        let x = -half + spacing * (i as f64 + 1.0);
        let dir = if i % 2 == 0 { 1 } else { -1 };
        walkers.push(walker(db, DVec2::new(x, 0.5), dir)?);
    }

    let hopper = db.create_entity();
    db.attach(hopper, Position(DVec2::new(0.0, 3.0)))?;
    db.attach(hopper, Velocity::new(DVec2::ZERO))?;
    db.attach(hopper, Collider::new(1.0, 1.0))?;
    db.attach(hopper, Sprite::new("hopper", "idle"))?;
    db.attach(hopper, Ai::new(Brain::Hopper))?;

    // No velocity: the template stays put and is skipped by the passes.
    let template = db.create_entity();
    db.attach(template, Position(DVec2::new(0.0, 6.0)))?;
    db.attach(template, Collider::new(1.0, 1.0))?;
    db.attach(template, Sprite::new("walker", "walk"))?;
    db.attach(template, Ai::new(Brain::Walker { dir: 1 }))?;
    db.attach(
        template,
        Spawner {
            interval: config.spawn_interval,
            lifetime: config.spawn_lifetime,
        },
    )?;

    info!(
        entities = db.entity_count(),
        walkers = walkers.len(),
        "level built"
    );
    Ok(Level {
        floor,
        walls,
        walkers,
        hopper,
        template,
    })
}

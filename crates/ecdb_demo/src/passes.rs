//! Per-tick simulation passes.
//!
//! Each pass is one cached query plus the work done on its matches. The
//! order within a tick is AI, physics, collision, render, lifetime, spawn.

use ecdb::{Database, DatabaseError, Entity, Not};
use glam::DVec2;
use serde::Serialize;

use crate::components::{Aabb, Ai, Brain, Collider, Lifetime, Position, Spawner, Sprite, Velocity};
use crate::level::{WALKER_FRICTION, WALKER_SPEED};
use crate::sprites::SpriteSheets;

const WALKER_ACCEL: f64 = 0.05;
const WALKER_JUMP: f64 = 1.0;
const HOP_IMPULSE: f64 = 0.8;
/// Keeps falling bodies from tunnelling through the one-unit-thick floor.
const MAX_FALL_SPEED: f64 = 0.9;

/// Steer every AI-driven entity from what it sensed last tick.
///
/// Returns the number of entities processed.
pub fn ai(db: &mut Database) -> Result<usize, DatabaseError> {
    let mut query = db.get_entities::<(Ai, Velocity)>()?;
    query.for_each_mut(|_, (ai, vel)| {
        let senses = &ai.senses;
        match &mut ai.brain {
            Brain::Walker { dir } => {
                let x_hit = i64::from(senses.hits_right) - i64::from(senses.hits_left);
                if x_hit > 0 {
                    *dir = -1;
                } else if x_hit < 0 {
                    *dir = 1;
                }
                let target = f64::from(*dir) * WALKER_SPEED;
                let step = (target - vel.linear.x).clamp(-WALKER_ACCEL, WALKER_ACCEL);
                vel.linear.x += step;

                let grounded = senses.hits_bottom > 0;
                let blocked = senses.hits_left > 0 || senses.hits_right > 0;
                if grounded && blocked {
                    vel.linear.y += WALKER_JUMP;
                }
            }
            Brain::Hopper => {
                if senses.hits_bottom > 0 && senses.hits_top == 0 {
                    vel.linear.y += HOP_IMPULSE;
                }
            }
        }
    });
    Ok(query.len())
}

/// Integrate velocities, then apply friction and gravity.
pub fn physics(db: &mut Database, gravity: f64) -> Result<usize, DatabaseError> {
    let mut query = db.get_entities::<(Position, Velocity)>()?;
    query.for_each_mut(|_, (pos, vel)| {
        pos.0 += vel.linear;
        vel.linear.x -= vel.linear.x * vel.friction;
        vel.linear.y = (vel.linear.y - gravity).max(-MAX_FALL_SPEED);
    });
    Ok(query.len())
}

/// Which side of a moving entity touched a static.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Bottom,
    Top,
}

/// Push moving colliders out of static ones and record the contacts in the
/// movers' [`Ai`] senses.
///
/// Statics are entities with a position and a collider but no velocity;
/// spawner templates are ignored. Returns the contacts found.
pub fn collision(db: &mut Database) -> Result<Vec<(Entity, Side)>, DatabaseError> {
    db.get_entities::<Ai>()?.for_each_mut(|_, ai| ai.senses.clear());

    let statics: Vec<Aabb> = db
        .get_entities_filtered::<(Position, Collider), Not<(Velocity, Spawner)>>()?
        .iter()
        .map(|(_, (pos, collider))| collider.aabb(pos.0))
        .collect();

    let mut contacts = Vec::new();
    db.get_entities::<(Position, Velocity, Collider)>()?
        .for_each_mut(|entity, (pos, vel, collider)| {
            for solid in &statics {
                let Some(depth) = collider.aabb(pos.0).overlap(solid) else {
                    continue;
                };
                let centre = (solid.min + solid.max) / 2.0;
                let side = if depth.x < depth.y {
                    if pos.0.x < centre.x {
                        pos.0.x -= depth.x;
                        Side::Right
                    } else {
                        pos.0.x += depth.x;
                        Side::Left
                    }
                } else if pos.0.y < centre.y {
                    pos.0.y -= depth.y;
                    Side::Top
                } else {
                    pos.0.y += depth.y;
                    Side::Bottom
                };
                match side {
                    Side::Left | Side::Right => vel.linear.x = 0.0,
                    Side::Bottom | Side::Top => vel.linear.y = 0.0,
                }
                contacts.push((entity, side));
            }
        });

    for &(entity, side) in &contacts {
        let Some(ai) = db.get_mut::<Ai>(entity) else {
            continue;
        };
        let senses = &mut ai.senses;
        match side {
            Side::Left => senses.hits_left += 1,
            Side::Right => senses.hits_right += 1,
            Side::Bottom => senses.hits_bottom += 1,
            Side::Top => senses.hits_top += 1,
        }
    }
    Ok(contacts)
}

/// One sprite frame to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawCall {
    pub entity: Entity,
    pub sprite: String,
    pub frame: usize,
    pub at: DVec2,
}

/// Advance sprite animations and emit the frame of every visible sprite.
///
/// Sprites whose sheet or animation is unknown are skipped.
pub fn render(db: &mut Database, sheets: &SpriteSheets) -> Result<Vec<DrawCall>, DatabaseError> {
    let mut draws = Vec::new();
    db.get_entities_filtered::<(Position, Sprite), Not<Spawner>>()?
        .for_each_mut(|entity, (pos, sprite)| {
            let Some(frames) = sheets.frames(&sprite.name, &sprite.anim) else {
                return;
            };
            sprite.ticker = sprite.ticker.saturating_sub(1);
            if sprite.ticker == 0 || sprite.frame.is_none() {
                let next = sprite.frame.map_or(0, |frame| (frame + 1) % frames.len());
                sprite.frame = Some(next);
                sprite.ticker = frames[next];
            }
            draws.push(DrawCall {
                entity,
                sprite: sprite.name.clone(),
                frame: sprite.frame.unwrap_or_default(),
                at: pos.0,
            });
        });
    Ok(draws)
}

/// Count down lifetimes and destroy the entities that expired.
pub fn lifetime(db: &mut Database) -> Result<Vec<Entity>, DatabaseError> {
    let mut expired = Vec::new();
    db.get_entities::<Lifetime>()?.for_each_mut(|entity, lifetime| {
        lifetime.0 = lifetime.0.saturating_sub(1);
        if lifetime.0 == 0 {
            expired.push(entity);
        }
    });
    for &entity in &expired {
        db.destroy(entity)?;
    }
    Ok(expired)
}

/// Clone every spawner template whose interval divides `tick_id`.
///
/// The copy loses the [`Spawner`] marker and gains a velocity and a
/// [`Lifetime`], so it joins the simulation.
pub fn spawn(db: &mut Database, tick_id: u64) -> Result<Vec<Entity>, DatabaseError> {
    let due: Vec<(Entity, Spawner)> = db
        .get_entities::<Spawner>()?
        .iter()
        .filter(|(_, spawner)| spawner.interval > 0 && tick_id % spawner.interval == 0)
        .map(|(entity, spawner)| (entity, *spawner))
        .collect();

    let mut spawned = Vec::with_capacity(due.len());
    for (template, spawner) in due {
        let copy = db.clone_entity(template)?;
        db.detach::<Spawner>(copy)?;
        let dir = match db.get::<Ai>(copy).map(|ai| ai.brain) {
            Some(Brain::Walker { dir }) => f64::from(dir),
            _ => 0.0,
        };
        db.attach(
            copy,
            Velocity::new(DVec2::new(dir * WALKER_SPEED, 0.0)).with_friction(WALKER_FRICTION),
        )?;
        db.attach(copy, Lifetime(spawner.lifetime))?;
        spawned.push(copy);
    }
    Ok(spawned)
}

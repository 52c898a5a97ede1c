//! Components of the demo level.
//!
//! Statics (ground, walls) carry a [`Position`] and a [`Collider`] but no
//! [`Velocity`]; everything that moves carries all three.

use ecdb::{Component, Database, DatabaseError};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// World-space centre of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub DVec2);

impl Component for Position {
    fn describe(&self) -> Option<String> {
        Some(format!("({:.2}, {:.2})", self.0.x, self.0.y))
    }
}

/// Per-tick displacement, decayed by `friction` after every move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: DVec2,
    /// Fraction of the velocity lost per tick, in `[0, 1]`.
    pub friction: f64,
}

impl Velocity {
    #[must_use]
    pub fn new(linear: DVec2) -> Self {
        Self {
            linear,
            friction: 0.0,
        }
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }
}

impl Component for Velocity {
    fn describe(&self) -> Option<String> {
        Some(format!(
            "({:.2}, {:.2}) friction {:.2}",
            self.linear.x, self.linear.y, self.friction
        ))
    }
}

/// An axis-aligned box centred on the entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub half_extents: DVec2,
}

impl Collider {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            half_extents: DVec2::new(width, height) / 2.0,
        }
    }

    /// The box in world space around `centre`.
    #[must_use]
    pub fn aabb(&self, centre: DVec2) -> Aabb {
        Aabb {
            min: centre - self.half_extents,
            max: centre + self.half_extents,
        }
    }
}

impl Component for Collider {}

/// World-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    /// Overlap depth on each axis, or `None` if the boxes do not intersect.
    #[must_use]
    pub fn overlap(&self, other: &Aabb) -> Option<DVec2> {
        let depth = self.max.min(other.max) - self.min.max(other.min);
        (depth.x > 0.0 && depth.y > 0.0).then_some(depth)
    }
}

/// Animated sprite state. Frame durations come from the sprite sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub name: String,
    pub anim: String,
    /// `None` until the first frame is shown.
    pub frame: Option<usize>,
    /// Ticks left on the current frame.
    pub ticker: u32,
}

impl Sprite {
    #[must_use]
    pub fn new(name: impl Into<String>, anim: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anim: anim.into(),
            frame: None,
            ticker: 0,
        }
    }
}

impl Component for Sprite {
    fn describe(&self) -> Option<String> {
        Some(format!("{}/{} frame {:?}", self.name, self.anim, self.frame))
    }
}

/// Contacts observed by the collision pass on the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Senses {
    pub hits_left: u32,
    pub hits_right: u32,
    pub hits_bottom: u32,
    pub hits_top: u32,
}

impl Senses {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Behavior selected for an AI-driven entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Brain {
    /// Walks in `dir` until it bumps into something, then turns around.
    Walker { dir: i8 },
    /// Stands still and hops whenever it is on the ground.
    Hopper,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ai {
    pub brain: Brain,
    pub senses: Senses,
}

impl Ai {
    #[must_use]
    pub fn new(brain: Brain) -> Self {
        Self {
            brain,
            senses: Senses::default(),
        }
    }
}

impl Component for Ai {
    fn describe(&self) -> Option<String> {
        Some(format!("{:?}", self.brain))
    }
}

/// Ticks until the entity is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime(pub u64);

impl Component for Lifetime {}

/// Marks an entity as a template that the spawner clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawner {
    /// Spawn once every `interval` ticks.
    pub interval: u64,
    /// Lifetime given to each spawned copy.
    pub lifetime: u64,
}

impl Component for Spawner {}

/// Register every demo component with `db`.
///
/// # Errors
///
/// Fails if any component was already registered.
pub fn register_all(db: &mut Database) -> Result<(), DatabaseError> {
    db.register::<Position>()?;
    db.register::<Velocity>()?;
    db.register::<Collider>()?;
    db.register::<Sprite>()?;
    db.register::<Ai>()?;
    db.register::<Lifetime>()?;
    db.register::<Spawner>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_overlap() {
        let a = Collider::new(2.0, 2.0).aabb(DVec2::ZERO);
        let b = Collider::new(2.0, 2.0).aabb(DVec2::new(1.5, 0.5));
        assert_eq!(a.overlap(&b), Some(DVec2::new(0.5, 1.5)));

        let far = Collider::new(2.0, 2.0).aabb(DVec2::new(3.0, 0.0));
        assert_eq!(a.overlap(&far), None);
    }

    #[test]
    fn test_register_all_once() {
        let mut db = Database::new();
        register_all(&mut db).unwrap();
        assert_eq!(db.registry().len(), 7);
        assert!(register_all(&mut db).is_err());
    }
}

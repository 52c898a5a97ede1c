//! Sprite sheet descriptors: frame durations per animation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Animations of one sprite sheet, each a list of frame durations in ticks.
pub type SpriteSheet = HashMap<String, Vec<u32>>;

/// Every sprite sheet known to the renderer, keyed by sprite name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpriteSheets {
    sheets: HashMap<String, SpriteSheet>,
}

impl SpriteSheets {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sheets: HashMap::new(),
        }
    }

    /// Add an animation to the sheet `name`.
    #[must_use]
    pub fn with_anim(mut self, name: &str, anim: &str, frames: Vec<u32>) -> Self {
        self.sheets
            .entry(name.to_owned())
            .or_default()
            .insert(anim.to_owned(), frames);
        self
    }

    /// Frame durations of `name`/`anim`, if both exist and the animation has
    /// at least one frame.
    #[must_use]
    pub fn frames(&self, name: &str, anim: &str) -> Option<&[u32]> {
        self.sheets
            .get(name)?
            .get(anim)
            .map(Vec::as_slice)
            .filter(|frames| !frames.is_empty())
    }
}

impl Default for SpriteSheets {
    fn default() -> Self {
        Self::new()
            .with_anim("walker", "walk", vec![8, 8])
            .with_anim("hopper", "idle", vec![20, 4, 4])
            .with_anim("block", "idle", vec![1])
    }
}

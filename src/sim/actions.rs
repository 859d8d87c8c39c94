//! Narrow mutation and query interface over sprite state
//!
//! The interpreter and the collision detector only ever touch sprites
//! through this trait. Mutators are fire-and-forget: an unknown sprite ID is
//! ignored, and every change is visible to the next query.

use std::collections::HashSet;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Sprite, SpriteId};
use crate::Millis;

/// Unordered sprite pair under collision cooldown.
///
/// `LockKey::new(a, b)` and `LockKey::new(b, a)` are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockKey(SpriteId, SpriteId);

impl LockKey {
    pub fn new(a: SpriteId, b: SpriteId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn sprites(&self) -> (SpriteId, SpriteId) {
        (self.0, self.1)
    }

    pub fn involves(&self, id: SpriteId) -> bool {
        self.0 == id || self.1 == id
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

pub trait StageActions {
    // === Queries ===
    /// Live sprite record
    fn sprite(&self, id: SpriteId) -> Option<&Sprite>;
    fn sprites(&self) -> &[Sprite];
    fn collision_locks(&self) -> &HashSet<LockKey>;

    // === Mutators ===
    fn set_sprite_running(&mut self, id: SpriteId, running: bool);
    fn update_sprite_position(&mut self, id: SpriteId, position: Vec2);
    fn update_sprite_rotation(&mut self, id: SpriteId, rotation: f32);

    fn set_say_text(&mut self, id: SpriteId, text: &str, duration_ms: Millis);
    fn clear_say_text(&mut self, id: SpriteId);
    fn set_think_text(&mut self, id: SpriteId, text: &str, duration_ms: Millis);
    fn clear_think_text(&mut self, id: SpriteId);

    /// Exchange the two sprites' whole programs
    fn swap_sprite_blocks(&mut self, a: SpriteId, b: SpriteId);

    fn add_collision_lock(&mut self, key: LockKey);
    fn remove_collision_lock(&mut self, key: LockKey);
}

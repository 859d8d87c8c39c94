//! Blockstage - block-programming sandbox playback core
//!
//! Core modules:
//! - `blocks`: Block catalog, instances, and text templates
//! - `sim`: Deterministic playback (sprite state, interpreter, collision swaps)
//! - `settings`: Playback timings and thresholds
//! - `error`: Crate error type

pub mod blocks;
pub mod error;
pub mod settings;
pub mod sim;

pub use blocks::{Block, BlockId, BlockKind, InputValue, create_block, get_definition};
pub use error::{Result, SandboxError};
pub use settings::PlaybackSettings;
pub use sim::{CollisionDetector, Engine, Playback, Sprite, SpriteId, Stage, StageActions};

use glam::Vec2;

/// Wall-clock or virtual timestamp in milliseconds
pub type Millis = f64;

/// Playback configuration constants
pub mod consts {
    use super::Millis;

    /// Pause inserted after every executed block so steps stay visible
    pub const PACING_MS: Millis = 50.0;

    /// Duration of a `move steps` animation
    pub const MOVE_DURATION_MS: Millis = 500.0;
    /// Duration of a `turn degrees` animation
    pub const TURN_DURATION_MS: Millis = 300.0;
    /// Duration of a `go to x/y` animation
    pub const GLIDE_DURATION_MS: Millis = 500.0;

    /// Collision scan cadence
    pub const COLLISION_TICK_MS: Millis = 100.0;
    /// Center distance below which two sprites collide (approximate sprite size)
    pub const COLLISION_DISTANCE: f32 = 50.0;
    /// How long a swapped pair stays locked before it can swap again
    pub const COLLISION_COOLDOWN_MS: Millis = 1000.0;

    /// New sprites spawn uniformly inside [-extent, extent) on both axes
    pub const SPAWN_HALF_EXTENT: f32 = 100.0;

    /// Frame interval of the headless driver (60 Hz)
    pub const FRAME_DT_MS: Millis = 1000.0 / 60.0;
}

/// Cubic ease-out: fast start, gentle landing.
///
/// Input is clamped to [0, 1].
#[inline]
pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

/// Unit heading for a rotation in degrees (0° points along +x)
#[inline]
pub fn heading_vector(rotation_deg: f32) -> Vec2 {
    let radians = rotation_deg.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

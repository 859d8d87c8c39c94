//! Deterministic playback module
//!
//! Everything that moves sprites lives here. Time is always passed in by the
//! host (`now` in milliseconds), so the same frame timestamps replay the same
//! run:
//! - No real timers or threads; suspensions resume on the next `advance`
//! - Stable iteration order (by sprite ID)
//! - No rendering dependencies; the host re-renders from `Stage`

pub mod actions;
pub mod collision;
pub mod engine;
pub mod state;
pub mod tick;
pub mod tween;

pub use actions::{LockKey, StageActions};
pub use collision::CollisionDetector;
pub use engine::Engine;
pub use state::{Sprite, SpriteId, Stage};
pub use tick::Playback;
pub use tween::{Tween, TweenValue};

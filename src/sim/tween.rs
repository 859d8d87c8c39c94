//! Frame-sampled eased transitions
//!
//! A tween does not advance on its own: the interpreter samples it once per
//! animation frame with the frame's timestamp.

use glam::Vec2;

use crate::{Millis, ease_out_cubic};

/// Interpolated value produced by a tween
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenValue {
    Position(Vec2),
    Rotation(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: TweenValue,
    to: TweenValue,
    start_ms: Millis,
    duration_ms: Millis,
}

impl Tween {
    pub fn position(from: Vec2, to: Vec2, start_ms: Millis, duration_ms: Millis) -> Self {
        Self {
            from: TweenValue::Position(from),
            to: TweenValue::Position(to),
            start_ms,
            duration_ms,
        }
    }

    pub fn rotation(from: f32, to: f32, start_ms: Millis, duration_ms: Millis) -> Self {
        Self {
            from: TweenValue::Rotation(from),
            to: TweenValue::Rotation(to),
            start_ms,
            duration_ms,
        }
    }

    /// Linear progress in [0, 1] at `now`
    pub fn progress(&self, now: Millis) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn is_done(&self, now: Millis) -> bool {
        self.progress(now) >= 1.0
    }

    /// Eased value at `now`
    pub fn sample(&self, now: Millis) -> TweenValue {
        let progress = self.progress(now);
        // Land exactly on the target instead of a float approximation of it
        if progress >= 1.0 {
            return self.to;
        }

        let t = ease_out_cubic(progress) as f32;
        match (self.from, self.to) {
            (TweenValue::Position(a), TweenValue::Position(b)) => TweenValue::Position(a.lerp(b, t)),
            (TweenValue::Rotation(a), TweenValue::Rotation(b)) => {
                TweenValue::Rotation(a + (b - a) * t)
            }
            // Constructors only build matching pairs
            _ => self.to,
        }
    }
}

//! Playback settings
//!
//! Timings and thresholds used by the interpreter and the collision
//! detector. Stored as JSON next to the host's other preferences.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Millis;
use crate::consts::*;
use crate::error::{Result, SandboxError};

/// Playback timings and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    // === Interpreter ===
    /// Pause after every block (ms)
    pub pacing_ms: Millis,
    /// `move steps` animation length (ms)
    pub move_duration_ms: Millis,
    /// `turn degrees` animation length (ms)
    pub turn_duration_ms: Millis,
    /// `go to x/y` animation length (ms)
    pub glide_duration_ms: Millis,

    // === Collision swap ===
    /// Scan cadence (ms)
    pub collision_tick_ms: Millis,
    /// Center distance that counts as touching
    pub collision_distance: f32,
    /// Lock duration after a swap (ms)
    pub collision_cooldown_ms: Millis,

    // === Stage ===
    /// Spawn area half extent for new sprites
    pub spawn_half_extent: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            pacing_ms: PACING_MS,
            move_duration_ms: MOVE_DURATION_MS,
            turn_duration_ms: TURN_DURATION_MS,
            glide_duration_ms: GLIDE_DURATION_MS,

            collision_tick_ms: COLLISION_TICK_MS,
            collision_distance: COLLISION_DISTANCE,
            collision_cooldown_ms: COLLISION_COOLDOWN_MS,

            spawn_half_extent: SPAWN_HALF_EXTENT,
        }
    }
}

impl PlaybackSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every timing is usable.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("pacing_ms", self.pacing_ms),
            ("move_duration_ms", self.move_duration_ms),
            ("turn_duration_ms", self.turn_duration_ms),
            ("glide_duration_ms", self.glide_duration_ms),
            ("collision_cooldown_ms", self.collision_cooldown_ms),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(SandboxError::InvalidSettings(format!(
                    "{name} must be a finite, non-negative duration (got {value})"
                )));
            }
        }

        // A zero cadence would rescan forever within a single frame
        if !self.collision_tick_ms.is_finite() || self.collision_tick_ms <= 0.0 {
            return Err(SandboxError::InvalidSettings(format!(
                "collision_tick_ms must be positive (got {})",
                self.collision_tick_ms
            )));
        }

        if !self.collision_distance.is_finite() || self.collision_distance <= 0.0 {
            return Err(SandboxError::InvalidSettings(format!(
                "collision_distance must be positive (got {})",
                self.collision_distance
            )));
        }

        if !self.spawn_half_extent.is_finite() || self.spawn_half_extent <= 0.0 {
            return Err(SandboxError::InvalidSettings(format!(
                "spawn_half_extent must be positive (got {})",
                self.spawn_half_extent
            )));
        }

        Ok(())
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded playback settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring settings in {}: {}", path.display(), e),
            },
            Err(e) => log::debug!("No settings at {}: {}", path.display(), e),
        }

        log::info!("Using default playback settings");
        Self::default()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Playback settings saved");
        Ok(())
    }
}

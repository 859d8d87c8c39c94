//! Playback driver
//!
//! Starts every sprite's program together, runs the collision detector
//! alongside, and winds both down when the last program ends or the user
//! stops playback. The host calls [`Playback::frame`] once per display frame.

use super::actions::StageActions;
use super::collision::CollisionDetector;
use super::engine::Engine;
use super::state::Stage;
use crate::Millis;
use crate::error::Result;
use crate::settings::PlaybackSettings;

#[derive(Debug, Clone)]
pub struct Playback {
    engine: Engine,
    detector: CollisionDetector,
}

impl Playback {
    /// Fails with `InvalidSettings` if any timing or threshold is unusable
    pub fn new(settings: PlaybackSettings) -> Result<Self> {
        let detector = CollisionDetector::new(&settings)?;
        Ok(Self {
            engine: Engine::new(settings),
            detector,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    /// Play/stop button. Returns whether playback is active afterwards.
    pub fn toggle(&mut self, stage: &mut Stage, now: Millis) -> bool {
        if stage.is_playing() {
            self.stop(stage, now);
        } else {
            self.play(stage, now);
        }
        stage.is_playing()
    }

    /// Start every sprite at once, with collision swapping enabled
    pub fn play(&mut self, stage: &mut Stage, now: Millis) {
        if stage.is_playing() {
            return;
        }

        let ids = stage.sprite_ids();
        stage.set_playing(true);
        self.detector.start(ids.clone(), now);

        let started = ids.iter().filter(|&&id| self.engine.run(stage, id, now)).count();
        log::info!("Playback started: {} of {} sprites running", started, ids.len());

        // Nothing to animate, or every program ended on its first step
        if self.engine.is_idle() {
            self.wind_down(stage);
        }
    }

    /// Stop all runs at their current suspension point
    pub fn stop(&mut self, stage: &mut Stage, now: Millis) {
        self.engine.stop_all();
        self.engine.advance(stage, now);
        self.wind_down(stage);
    }

    fn wind_down(&mut self, stage: &mut Stage) {
        self.detector.stop();
        if stage.is_playing() {
            stage.set_playing(false);
            log::info!("Playback ended");
        }
    }

    /// Advance one display frame. Returns whether playback is still active.
    pub fn frame(&mut self, stage: &mut Stage, now: Millis) -> bool {
        self.engine.advance(stage, now);
        // Runs even after playback ends so pending locks still expire
        self.detector.advance(stage, now);

        if stage.is_playing() && self.engine.is_idle() {
            self.wind_down(stage);
        }
        stage.is_playing()
    }

    /// True once nothing is running and no collision lock is pending
    pub fn is_settled(&self, stage: &Stage) -> bool {
        self.engine.is_idle() && self.detector.pending_unlocks() == 0 && stage.collision_locks().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::blocks::{Block, BlockKind};
    use crate::consts::FRAME_DT_MS;
    use crate::sim::state::SpriteId;

    const CAT: SpriteId = SpriteId(1);

    fn frames_until_done(playback: &mut Playback, stage: &mut Stage, start: Millis) -> Millis {
        let mut now = start;
        for _ in 0..100_000 {
            now += FRAME_DT_MS;
            if !playback.frame(stage, now) {
                return now;
            }
        }
        panic!("playback never ended");
    }

    #[test]
    fn test_play_runs_all_sprites_concurrently() {
        let mut stage = Stage::new(12345);
        stage.add_block(Block::new(BlockKind::MoveSteps)).unwrap();
        let other = stage.add_sprite();
        stage.update_sprite_position(other, Vec2::new(300.0, 300.0));
        stage.select_sprite(other).unwrap();
        stage.add_block(Block::with_inputs(BlockKind::TurnDegrees, [("degrees", 90)])).unwrap();

        let mut playback = Playback::new(PlaybackSettings::default()).unwrap();
        assert!(playback.toggle(&mut stage, 0.0));
        assert!(stage.sprite(CAT).unwrap().is_running);
        assert!(stage.sprite(other).unwrap().is_running);
        assert!(playback.detector().is_running());

        let ended_at = frames_until_done(&mut playback, &mut stage, 0.0);
        // Both run side by side: done after the longer one (500 ms + 50 ms pacing)
        assert!(ended_at < 700.0, "ended at {ended_at}");

        assert!(!stage.is_playing());
        assert!(!playback.detector().is_running());
        assert!((stage.sprite(CAT).unwrap().position - Vec2::new(10.0, 0.0)).length() < 1e-4);
        assert_eq!(stage.sprite(other).unwrap().rotation, 90.0);
    }

    #[test]
    fn test_play_with_no_programs_ends_immediately() {
        let mut stage = Stage::new(1);
        let mut playback = Playback::new(PlaybackSettings::default()).unwrap();
        assert!(!playback.toggle(&mut stage, 0.0));
        assert!(!playback.detector().is_running());
    }

    #[test]
    fn test_toggle_stops_promptly() {
        let mut stage = Stage::new(1);
        let mut repeat = Block::with_inputs(BlockKind::Repeat, [("times", 1000)]);
        repeat.push_child(Block::new(BlockKind::MoveSteps)).unwrap();
        stage.add_block(repeat).unwrap();

        let mut playback = Playback::new(PlaybackSettings::default()).unwrap();
        playback.toggle(&mut stage, 0.0);
        playback.frame(&mut stage, 200.0);

        assert!(!playback.toggle(&mut stage, 216.0));
        let cat = stage.sprite(CAT).unwrap();
        assert!(!cat.is_running);
        assert!(cat.position.x < 10.0);
        assert!(playback.engine().is_idle());

        // Later frames change nothing
        let x = cat.position.x;
        playback.frame(&mut stage, 5000.0);
        assert_eq!(stage.sprite(CAT).unwrap().position.x, x);
    }

    #[test]
    fn test_collision_swap_during_playback() {
        // Two sprites glide to the same spot; they swap once they meet
        let mut stage = Stage::new(12345);
        stage.add_block(Block::with_inputs(BlockKind::GoToXy, [("x", 0), ("y", 0)])).unwrap();
        stage.add_block(Block::with_inputs(BlockKind::Say, [("text", "cat")])).unwrap();
        stage.update_sprite_position(CAT, Vec2::new(-100.0, 0.0));

        let other = stage.add_sprite();
        stage.update_sprite_position(other, Vec2::new(100.0, 0.0));
        stage.select_sprite(other).unwrap();
        stage.add_block(Block::with_inputs(BlockKind::GoToXy, [("x", 0), ("y", 0)])).unwrap();
        stage.add_block(Block::with_inputs(BlockKind::Think, [("text", "other")])).unwrap();

        // Cooldown outlasts the run, so the pair can only swap once
        let settings = PlaybackSettings {
            collision_cooldown_ms: 10_000.0,
            ..Default::default()
        };
        let mut playback = Playback::new(settings).unwrap();
        playback.toggle(&mut stage, 0.0);

        // Watch the bubbles each sprite shows while its run is in flight
        let mut cat_said = Vec::new();
        let mut cat_thought = Vec::new();
        let mut other_thought = Vec::new();
        let mut swapped_mid_run = false;
        let mut now = 0.0;
        while playback.frame(&mut stage, now + FRAME_DT_MS) {
            now += FRAME_DT_MS;
            let cat = stage.sprite(CAT).unwrap();
            cat_said.extend(cat.speech().map(str::to_string));
            cat_thought.extend(cat.thought().map(str::to_string));
            other_thought.extend(stage.sprite(other).unwrap().thought().map(str::to_string));
            swapped_mid_run |= cat.is_running && cat.blocks[1].kind == BlockKind::Think;
            assert!(now < 10_000.0, "playback never ended");
        }

        // Programs were exchanged exactly once, while both were still running
        assert!(swapped_mid_run);
        assert_eq!(stage.sprite(CAT).unwrap().blocks[1].kind, BlockKind::Think);
        assert_eq!(stage.sprite(other).unwrap().blocks[1].kind, BlockKind::Say);

        // Each run finished the program it started with
        assert!(!cat_said.is_empty());
        assert!(cat_said.iter().all(|text| text == "cat"));
        assert!(cat_thought.is_empty());
        assert!(!other_thought.is_empty());
        assert!(other_thought.iter().all(|text| text == "other"));
        assert_eq!(stage.sprite(CAT).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let settings = PlaybackSettings {
            collision_tick_ms: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Playback::new(settings),
            Err(crate::error::SandboxError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_locks_expire_after_playback_ends() {
        let mut stage = Stage::new(12345);
        stage.add_block(Block::with_inputs(BlockKind::TurnDegrees, [("degrees", 5)])).unwrap();
        let other = stage.add_sprite();
        stage.update_sprite_position(other, Vec2::ZERO);

        let mut playback = Playback::new(PlaybackSettings::default()).unwrap();
        playback.toggle(&mut stage, 0.0);
        let ended_at = frames_until_done(&mut playback, &mut stage, 0.0);
        assert!(!stage.collision_locks().is_empty());
        assert!(!playback.is_settled(&stage));

        playback.frame(&mut stage, ended_at + 1000.0);
        assert!(playback.is_settled(&stage));
    }
}

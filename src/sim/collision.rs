//! Collision swap detector
//!
//! While playback runs, every sprite pair is checked on a fixed cadence. Two
//! sprites whose centers are closer than the collision distance trade their
//! programs once, then the pair is locked for a cooldown so sprites that
//! stay touching do not swap back and forth.
//!
//! The check is a plain center-distance test, not shape collision.

use glam::Vec2;

use super::actions::{LockKey, StageActions};
use super::state::SpriteId;
use crate::Millis;
use crate::error::Result;
use crate::settings::PlaybackSettings;

/// Whether two sprite centers are close enough to count as touching
#[inline]
pub fn are_colliding(a: Vec2, b: Vec2, distance: f32) -> bool {
    a.distance(b) < distance
}

#[derive(Debug, Clone, PartialEq)]
enum DetectorState {
    Stopped,
    Running {
        /// Observed sprites; positions are read live each scan
        sprites: Vec<SpriteId>,
        /// The single scan timer
        next_scan_at: Millis,
    },
}

/// Periodic proximity scanner that swaps programs between touching sprites
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    scan_interval_ms: Millis,
    distance: f32,
    cooldown_ms: Millis,
    state: DetectorState,
    /// Lock releases waiting for their cooldown, oldest first
    pending_unlocks: Vec<(Millis, LockKey)>,
}

impl CollisionDetector {
    /// Fails with `InvalidSettings` unless the scan interval is positive
    pub fn new(settings: &PlaybackSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            scan_interval_ms: settings.collision_tick_ms,
            distance: settings.collision_distance,
            cooldown_ms: settings.collision_cooldown_ms,
            state: DetectorState::Stopped,
            pending_unlocks: Vec::new(),
        })
    }

    /// Begin observing `sprites`; first scan one interval after `now`.
    ///
    /// Starting again while running only replaces the observed list, the
    /// existing scan schedule is kept.
    pub fn start(&mut self, sprites: Vec<SpriteId>, now: Millis) {
        match &mut self.state {
            DetectorState::Running { sprites: observed, .. } => {
                log::debug!("Collision detector already running, now observing {} sprites", sprites.len());
                *observed = sprites;
            }
            DetectorState::Stopped => {
                log::info!("Collision detector started ({} sprites)", sprites.len());
                self.state = DetectorState::Running {
                    sprites,
                    next_scan_at: now + self.scan_interval_ms,
                };
            }
        }
    }

    /// Stop scanning. Locks already taken still release on schedule.
    pub fn stop(&mut self) {
        if self.state != DetectorState::Stopped {
            log::info!("Collision detector stopped");
            self.state = DetectorState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DetectorState::Running { .. })
    }

    pub fn observed(&self) -> &[SpriteId] {
        match &self.state {
            DetectorState::Running { sprites, .. } => sprites,
            DetectorState::Stopped => &[],
        }
    }

    /// Locks still waiting on their cooldown
    pub fn pending_unlocks(&self) -> usize {
        self.pending_unlocks.len()
    }

    /// Release expired locks, then scan if the timer is due.
    ///
    /// At most one scan runs per call; a late frame does not replay missed
    /// scans. Returns the number of swaps made.
    pub fn advance<A: StageActions + ?Sized>(&mut self, actions: &mut A, now: Millis) -> usize {
        self.release_expired(actions, now);

        let due = match &mut self.state {
            DetectorState::Running { next_scan_at, .. } if now >= *next_scan_at => {
                // Skip to the first grid point after `now`
                let missed = ((now - *next_scan_at) / self.scan_interval_ms).floor() + 1.0;
                *next_scan_at += missed * self.scan_interval_ms;
                true
            }
            _ => false,
        };

        if due { self.scan(actions, now) } else { 0 }
    }

    fn release_expired<A: StageActions + ?Sized>(&mut self, actions: &mut A, now: Millis) {
        self.pending_unlocks.retain(|&(release_at, key)| {
            if release_at <= now {
                actions.remove_collision_lock(key);
                log::debug!("Collision lock {} released", key);
                false
            } else {
                true
            }
        });
    }

    /// Check every observed pair once
    pub fn scan<A: StageActions + ?Sized>(&mut self, actions: &mut A, now: Millis) -> usize {
        let DetectorState::Running { sprites, .. } = &self.state else {
            return 0;
        };
        if sprites.len() < 2 {
            return 0;
        }

        // Snapshot positions first; swaps never move sprites
        let positions: Vec<(SpriteId, Vec2)> = sprites
            .iter()
            .filter_map(|&id| actions.sprite(id).map(|s| (id, s.position)))
            .collect();

        let mut swaps = 0;
        for (i, &(a, pos_a)) in positions.iter().enumerate() {
            for &(b, pos_b) in &positions[i + 1..] {
                if a != b && are_colliding(pos_a, pos_b, self.distance) {
                    swaps += usize::from(self.handle_collision(actions, a, b, now));
                }
            }
        }
        swaps
    }

    /// Swap two touching sprites' programs unless the pair is cooling down
    fn handle_collision<A: StageActions + ?Sized>(
        &mut self,
        actions: &mut A,
        a: SpriteId,
        b: SpriteId,
        now: Millis,
    ) -> bool {
        let key = LockKey::new(a, b);
        if actions.collision_locks().contains(&key) {
            return false;
        }

        actions.add_collision_lock(key);
        actions.swap_sprite_blocks(a, b);
        log::info!("Collision! Swapped blocks between {} and {}", a, b);

        self.pending_unlocks.push((now + self.cooldown_ms, key));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Block, BlockKind};
    use crate::error::SandboxError;
    use crate::sim::state::Stage;

    const CAT: SpriteId = SpriteId(1);

    /// Cat with a `move` program and a second sprite with `say`, both placed
    fn two_sprites(cat_at: Vec2, other_at: Vec2) -> (Stage, SpriteId) {
        let mut stage = Stage::new(12345);
        stage.add_block(Block::new(BlockKind::MoveSteps)).unwrap();
        let other = stage.add_sprite();
        stage.select_sprite(other).unwrap();
        stage.add_block(Block::new(BlockKind::Say)).unwrap();
        stage.update_sprite_position(CAT, cat_at);
        stage.update_sprite_position(other, other_at);
        (stage, other)
    }

    fn first_kind(stage: &Stage, id: SpriteId) -> BlockKind {
        stage.sprite(id).unwrap().blocks[0].kind
    }

    #[test]
    fn test_proximity_threshold() {
        assert!(are_colliding(Vec2::ZERO, Vec2::ZERO, 50.0));
        assert!(are_colliding(Vec2::ZERO, Vec2::new(30.0, 39.0), 50.0));
        // Exactly at the threshold is not a collision
        assert!(!are_colliding(Vec2::ZERO, Vec2::new(30.0, 40.0), 50.0));
    }

    #[test]
    fn test_colocated_sprites_swap_once_per_cooldown() {
        let (mut stage, other) = two_sprites(Vec2::ZERO, Vec2::ZERO);
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);

        // Nothing before the first scan
        assert_eq!(detector.advance(&mut stage, 99.0), 0);
        assert_eq!(first_kind(&stage, CAT), BlockKind::MoveSteps);

        assert_eq!(detector.advance(&mut stage, 100.0), 1);
        assert_eq!(first_kind(&stage, CAT), BlockKind::Say);
        assert_eq!(first_kind(&stage, other), BlockKind::MoveSteps);
        assert!(stage.collision_locks().contains(&LockKey::new(other, CAT)));

        // Still touching, still locked: no swap back
        for now in [200.0, 500.0, 1000.0] {
            assert_eq!(detector.advance(&mut stage, now), 0);
        }
        assert_eq!(first_kind(&stage, CAT), BlockKind::Say);
    }

    #[test]
    fn test_lock_release_allows_next_swap() {
        let (mut stage, other) = two_sprites(Vec2::ZERO, Vec2::new(10.0, 0.0));
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);

        assert_eq!(detector.advance(&mut stage, 100.0), 1);
        assert_eq!(detector.advance(&mut stage, 1000.0), 0);

        // Cooldown ends at 1100, the scan at 1100 swaps back
        assert_eq!(detector.advance(&mut stage, 1100.0), 1);
        assert_eq!(first_kind(&stage, CAT), BlockKind::MoveSteps);
        assert_eq!(first_kind(&stage, other), BlockKind::Say);
    }

    #[test]
    fn test_lock_releases_even_when_apart() {
        let (mut stage, other) = two_sprites(Vec2::ZERO, Vec2::ZERO);
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);
        detector.advance(&mut stage, 100.0);

        stage.update_sprite_position(other, Vec2::new(500.0, 0.0));
        detector.advance(&mut stage, 1100.0);
        assert!(stage.collision_locks().is_empty());
        assert_eq!(detector.pending_unlocks(), 0);
    }

    #[test]
    fn test_distant_sprites_never_swap() {
        let (mut stage, _) = two_sprites(Vec2::ZERO, Vec2::new(0.0, 60.0));
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);

        let mut swaps = 0;
        for step in 1..=20 {
            swaps += detector.advance(&mut stage, step as f64 * 100.0);
        }
        assert_eq!(swaps, 0);
        assert!(stage.collision_locks().is_empty());
    }

    #[test]
    fn test_single_sprite_scan_is_noop() {
        let mut stage = Stage::new(1);
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);
        assert_eq!(detector.advance(&mut stage, 100.0), 0);
    }

    #[test]
    fn test_restart_keeps_single_timer() {
        let (mut stage, other) = two_sprites(Vec2::ZERO, Vec2::ZERO);
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(vec![CAT], 0.0);
        detector.start(vec![CAT, other], 50.0);
        assert_eq!(detector.observed(), &[CAT, other]);

        // Schedule from the first start is kept: scan at 100, not 150
        assert_eq!(detector.advance(&mut stage, 100.0), 1);
        // One timer means one scan per interval
        assert_eq!(detector.advance(&mut stage, 150.0), 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_halts_scans() {
        let (mut stage, _) = two_sprites(Vec2::ZERO, Vec2::ZERO);
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.stop();
        assert!(!detector.is_running());

        detector.start(stage.sprite_ids(), 0.0);
        detector.stop();
        detector.stop();
        assert_eq!(detector.advance(&mut stage, 100.0), 0);
        assert_eq!(first_kind(&stage, CAT), BlockKind::MoveSteps);
        assert!(detector.observed().is_empty());
    }

    #[test]
    fn test_late_frame_runs_one_scan() {
        let (mut stage, _) = two_sprites(Vec2::ZERO, Vec2::ZERO);
        let settings = PlaybackSettings {
            collision_cooldown_ms: 0.0,
            ..Default::default()
        };
        let mut detector = CollisionDetector::new(&settings).unwrap();
        detector.start(stage.sprite_ids(), 0.0);

        // 1 s gap: one scan, not ten
        assert_eq!(detector.advance(&mut stage, 1000.0), 1);
        // Next scan lands on the original grid
        assert_eq!(detector.advance(&mut stage, 1050.0), 0);
        assert_eq!(detector.advance(&mut stage, 1100.0), 1);
    }

    #[test]
    fn test_rejects_unusable_scan_interval() {
        for tick in [0.0, -100.0, f64::NAN] {
            let settings = PlaybackSettings {
                collision_tick_ms: tick,
                ..Default::default()
            };
            let err = CollisionDetector::new(&settings).unwrap_err();
            assert!(matches!(err, SandboxError::InvalidSettings(_)));
        }
    }

    #[test]
    fn test_long_gap_keeps_grid() {
        let (mut stage, _) = two_sprites(Vec2::ZERO, Vec2::new(500.0, 0.0));
        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);

        assert_eq!(detector.advance(&mut stage, 1.0e9 + 50.0), 0);
        // Next scan is the grid point after the gap, not one per missed tick
        assert_eq!(detector.advance(&mut stage, 1.0e9 + 99.0), 0);
        stage.update_sprite_position(CAT, Vec2::new(500.0, 0.0));
        assert_eq!(detector.advance(&mut stage, 1.0e9 + 100.0), 1);
    }

    #[test]
    fn test_three_sprites_each_pair_checked() {
        let mut stage = Stage::new(3);
        let b = stage.add_sprite();
        let c = stage.add_sprite();
        stage.update_sprite_position(CAT, Vec2::ZERO);
        stage.update_sprite_position(b, Vec2::new(20.0, 0.0));
        stage.update_sprite_position(c, Vec2::new(300.0, 0.0));

        let mut detector = CollisionDetector::new(&PlaybackSettings::default()).unwrap();
        detector.start(stage.sprite_ids(), 0.0);
        assert_eq!(detector.advance(&mut stage, 100.0), 1);
        assert_eq!(stage.collision_locks().len(), 1);
        assert!(stage.collision_locks().contains(&LockKey::new(CAT, b)));
    }
}

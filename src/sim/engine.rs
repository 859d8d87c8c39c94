//! Block interpreter
//!
//! Each running sprite owns a small state machine: a stack of block lists
//! (one per active `repeat`) and the suspension it is currently waiting on.
//! The host calls [`Engine::advance`] once per animation frame; a run only
//! moves forward when its suspension has elapsed, so blocks of one sprite
//! never overlap.
//!
//! A run captures the sprite's program when it starts. Swapping programs
//! mid-run changes what the *next* run executes, not the current one.

use std::collections::BTreeMap;

use glam::Vec2;

use super::actions::StageActions;
use super::state::SpriteId;
use super::tween::{Tween, TweenValue};
use crate::blocks::{Block, BlockKind};
use crate::error::{Result, SandboxError};
use crate::settings::PlaybackSettings;
use crate::{Millis, heading_vector};

/// Which bubble a looks block drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bubble {
    Say,
    Think,
}

impl Bubble {
    fn show<A: StageActions + ?Sized>(self, actions: &mut A, id: SpriteId, text: &str, ms: Millis) {
        match self {
            Bubble::Say => actions.set_say_text(id, text, ms),
            Bubble::Think => actions.set_think_text(id, text, ms),
        }
    }

    fn clear<A: StageActions + ?Sized>(self, actions: &mut A, id: SpriteId) {
        match self {
            Bubble::Say => actions.clear_say_text(id),
            Bubble::Think => actions.clear_think_text(id),
        }
    }
}

/// What a run is waiting on
#[derive(Debug, Clone, Copy)]
enum Wait {
    /// Start the next block now
    Ready,
    /// Sampled every frame until the tween lands
    Animating(Tween),
    Speaking { bubble: Bubble, until: Millis },
    /// Gap after a finished block
    Pacing { until: Millis },
}

/// One block list being walked
#[derive(Debug, Clone)]
struct Frame {
    blocks: Vec<Block>,
    next: usize,
    /// Passes left including the current one
    passes_left: u32,
}

enum Next {
    Block(Block),
    /// A `repeat` ran its last pass
    ContainerDone,
    Finished,
}

#[derive(Debug, Clone)]
struct SpriteRun {
    frames: Vec<Frame>,
    wait: Wait,
    cancelled: bool,
    blocks_executed: u64,
}

impl SpriteRun {
    fn new(program: Vec<Block>) -> Self {
        Self {
            frames: vec![Frame {
                blocks: program,
                next: 0,
                passes_left: 1,
            }],
            wait: Wait::Ready,
            cancelled: false,
            blocks_executed: 0,
        }
    }

    fn next_block(&mut self) -> Next {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Next::Finished;
            };

            if let Some(block) = frame.blocks.get(frame.next) {
                frame.next += 1;
                return Next::Block(block.clone());
            }

            if frame.passes_left > 1 {
                frame.passes_left -= 1;
                frame.next = 0;
                continue;
            }

            self.frames.pop();
            return if self.frames.is_empty() {
                Next::Finished
            } else {
                Next::ContainerDone
            };
        }
    }

    fn pace(&mut self, now: Millis, settings: &PlaybackSettings) {
        self.wait = Wait::Pacing {
            until: now + settings.pacing_ms,
        };
    }

    /// Drop any in-flight effect that must not outlive the run
    fn abandon<A: StageActions + ?Sized>(&mut self, id: SpriteId, actions: &mut A) {
        if let Wait::Speaking { bubble, .. } = self.wait {
            bubble.clear(actions, id);
        }
        self.frames.clear();
        self.wait = Wait::Ready;
    }

    /// Move the run forward to `now`; starts at most one block that suspends.
    ///
    /// Returns `Ok(true)` once the run has nothing left to do.
    fn drive<A: StageActions + ?Sized>(
        &mut self,
        id: SpriteId,
        now: Millis,
        settings: &PlaybackSettings,
        actions: &mut A,
    ) -> Result<bool> {
        loop {
            if self.cancelled {
                log::info!("{} stopped after {} blocks", id, self.blocks_executed);
                self.abandon(id, actions);
                return Ok(true);
            }

            // Every suspension yields the frame, even a zero-length one
            match self.wait {
                Wait::Ready => match self.next_block() {
                    Next::Block(block) => {
                        self.blocks_executed += 1;
                        self.start_block(id, &block, now, settings, actions)?;
                        // Only entering a `repeat` continues straight on
                        if !matches!(self.wait, Wait::Ready) {
                            return Ok(false);
                        }
                    }
                    Next::ContainerDone => {
                        self.pace(now, settings);
                        return Ok(false);
                    }
                    Next::Finished => return Ok(true),
                },
                Wait::Animating(tween) => {
                    match tween.sample(now) {
                        TweenValue::Position(p) => actions.update_sprite_position(id, p),
                        TweenValue::Rotation(r) => actions.update_sprite_rotation(id, r),
                    }
                    if tween.is_done(now) {
                        self.pace(now, settings);
                    }
                    return Ok(false);
                }
                Wait::Speaking { bubble, until } => {
                    if now < until {
                        return Ok(false);
                    }
                    bubble.clear(actions, id);
                    self.pace(now, settings);
                    return Ok(false);
                }
                Wait::Pacing { until } => {
                    if now < until {
                        return Ok(false);
                    }
                    self.wait = Wait::Ready;
                }
            }
        }
    }

    /// Begin one block and set the suspension it waits on
    fn start_block<A: StageActions + ?Sized>(
        &mut self,
        id: SpriteId,
        block: &Block,
        now: Millis,
        settings: &PlaybackSettings,
        actions: &mut A,
    ) -> Result<()> {
        log::debug!("{} runs {}", id, block.render_text());

        match block.kind {
            BlockKind::MoveSteps => {
                let Some(steps) = read_number(block, "steps") else {
                    self.pace(now, settings);
                    return Ok(());
                };
                let Some(sprite) = actions.sprite(id) else {
                    self.pace(now, settings);
                    return Ok(());
                };
                let from = sprite.position;
                let to = from + heading_vector(sprite.rotation) * steps as f32;
                ensure_finite(id, block, to.is_finite())?;
                self.animate(Tween::position(from, to, now, settings.move_duration_ms));
            }
            BlockKind::TurnDegrees => {
                let Some(degrees) = read_number(block, "degrees") else {
                    self.pace(now, settings);
                    return Ok(());
                };
                let Some(sprite) = actions.sprite(id) else {
                    self.pace(now, settings);
                    return Ok(());
                };
                let from = sprite.rotation;
                let to = from + degrees as f32;
                ensure_finite(id, block, to.is_finite())?;
                self.animate(Tween::rotation(from, to, now, settings.turn_duration_ms));
            }
            BlockKind::GoToXy => {
                let (Some(x), Some(y)) = (read_number(block, "x"), read_number(block, "y")) else {
                    self.pace(now, settings);
                    return Ok(());
                };
                let Some(sprite) = actions.sprite(id) else {
                    self.pace(now, settings);
                    return Ok(());
                };
                let from = sprite.position;
                let to = Vec2::new(x as f32, y as f32);
                ensure_finite(id, block, to.is_finite())?;
                self.animate(Tween::position(from, to, now, settings.glide_duration_ms));
            }
            BlockKind::Repeat => {
                let passes = read_number(block, "times").map(repeat_passes).unwrap_or(0);
                let children = block.children().unwrap_or_default();
                if passes == 0 || children.is_empty() {
                    self.pace(now, settings);
                } else {
                    self.frames.push(Frame {
                        blocks: children.to_vec(),
                        next: 0,
                        passes_left: passes,
                    });
                    self.wait = Wait::Ready;
                }
            }
            BlockKind::Say => self.speak(id, block, Bubble::Say, now, settings, actions),
            BlockKind::Think => self.speak(id, block, Bubble::Think, now, settings, actions),
        }

        Ok(())
    }

    fn animate(&mut self, tween: Tween) {
        self.wait = Wait::Animating(tween);
    }

    fn speak<A: StageActions + ?Sized>(
        &mut self,
        id: SpriteId,
        block: &Block,
        bubble: Bubble,
        now: Millis,
        settings: &PlaybackSettings,
        actions: &mut A,
    ) {
        let Some(seconds) = read_number(block, "seconds") else {
            self.pace(now, settings);
            return;
        };
        let duration_ms = (seconds * 1000.0).max(0.0);

        bubble.show(actions, id, &block.text("text"), duration_ms);
        if duration_ms > 0.0 {
            self.wait = Wait::Speaking {
                bubble,
                until: now + duration_ms,
            };
        } else {
            bubble.clear(actions, id);
            self.pace(now, settings);
        }
    }
}

/// Numeric input, or `None` (logged) when the edited value is not a number
fn read_number(block: &Block, name: &str) -> Option<f64> {
    match block.number(name) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Skipping {}: {}", block.kind, e);
            None
        }
    }
}

/// Whole passes for a `repeat` count: a loop of `i < times`
pub fn repeat_passes(times: f64) -> u32 {
    if times.is_nan() || times <= 0.0 {
        0
    } else {
        times.ceil().min(u32::MAX as f64) as u32
    }
}

fn ensure_finite(id: SpriteId, block: &Block, finite: bool) -> Result<()> {
    if finite {
        Ok(())
    } else {
        Err(SandboxError::ExecutionFailure {
            sprite: id,
            reason: format!("{} produced a non-finite target", block.render_text()),
        })
    }
}

/// Interpreter for every running sprite
#[derive(Debug, Clone)]
pub struct Engine {
    settings: PlaybackSettings,
    /// Active runs, iterated in sprite ID order
    runs: BTreeMap<SpriteId, SpriteRun>,
}

impl Engine {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            settings,
            runs: BTreeMap::new(),
        }
    }

    /// Start running a sprite's program.
    ///
    /// A sprite that is already running, has an empty program, or does not
    /// exist is left alone; returns whether a run was started. The first
    /// block begins immediately.
    pub fn run<A: StageActions + ?Sized>(&mut self, actions: &mut A, id: SpriteId, now: Millis) -> bool {
        let Some(sprite) = actions.sprite(id) else {
            log::debug!("{} not found, nothing to run", id);
            return false;
        };
        if sprite.is_running || sprite.blocks.is_empty() || self.runs.contains_key(&id) {
            return false;
        }

        let program = sprite.blocks.clone();
        log::info!("{} started ({} top-level blocks)", id, program.len());
        actions.set_sprite_running(id, true);

        let mut run = SpriteRun::new(program);
        match run.drive(id, now, &self.settings, actions) {
            Ok(false) => {
                self.runs.insert(id, run);
            }
            Ok(true) => Self::finish(id, actions),
            Err(e) => {
                log::error!("Animation error for {}: {}", id, e);
                run.abandon(id, actions);
                Self::finish(id, actions);
            }
        }
        true
    }

    /// Advance every run to `now`. Returns the sprites whose run ended.
    pub fn advance<A: StageActions + ?Sized>(&mut self, actions: &mut A, now: Millis) -> Vec<SpriteId> {
        let mut ended = Vec::new();

        for (&id, run) in self.runs.iter_mut() {
            match run.drive(id, now, &self.settings, actions) {
                Ok(false) => {}
                Ok(true) => ended.push(id),
                Err(e) => {
                    // Contained to this sprite; the others keep going
                    log::error!("Animation error for {}: {}", id, e);
                    run.abandon(id, actions);
                    ended.push(id);
                }
            }
        }

        for &id in &ended {
            self.runs.remove(&id);
            Self::finish(id, actions);
        }
        ended
    }

    fn finish<A: StageActions + ?Sized>(id: SpriteId, actions: &mut A) {
        actions.set_sprite_running(id, false);
        log::info!("{} finished", id);
    }

    /// Ask one run to stop at its next suspension point
    pub fn stop(&mut self, id: SpriteId) {
        if let Some(run) = self.runs.get_mut(&id) {
            run.cancelled = true;
        }
    }

    /// Ask every run to stop at its next suspension point
    pub fn stop_all(&mut self) {
        for run in self.runs.values_mut() {
            run.cancelled = true;
        }
    }

    pub fn is_running(&self, id: SpriteId) -> bool {
        self.runs.contains_key(&id)
    }

    pub fn active_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.runs.is_empty()
    }
}

//! Stage state and sprites
//!
//! `Stage` is the single owned session object: every sprite, the editing
//! selection, the playing flag, and the collision lock set. It is passed by
//! `&mut` to the interpreter and the detector through `StageActions`.

use std::collections::HashSet;
use std::fmt;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actions::{LockKey, StageActions};
use crate::Millis;
use crate::blocks::{Block, InputValue};
use crate::consts::SPAWN_HALF_EXTENT;
use crate::error::{Result, SandboxError};

/// Sprite identifier (displayed as `sprite{n}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(pub u32);

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sprite{}", self.0)
    }
}

/// An actor on the stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprite {
    pub id: SpriteId,
    pub name: String,
    /// Stage coordinates, origin at center
    pub position: Vec2,
    /// Degrees, unnormalized (turning past 360 keeps counting)
    pub rotation: f32,
    /// Program
    pub blocks: Vec<Block>,
    pub say_text: String,
    pub say_duration_ms: Millis,
    pub think_text: String,
    pub think_duration_ms: Millis,
    pub is_running: bool,
}

impl Sprite {
    pub fn new(id: SpriteId, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            rotation: 0.0,
            blocks: Vec::new(),
            say_text: String::new(),
            say_duration_ms: 0.0,
            think_text: String::new(),
            think_duration_ms: 0.0,
            is_running: false,
        }
    }

    /// Speech bubble text, if one is showing
    pub fn speech(&self) -> Option<&str> {
        (!self.say_text.is_empty()).then_some(self.say_text.as_str())
    }

    /// Thought bubble text, if one is showing
    pub fn thought(&self) -> Option<&str> {
        (!self.think_text.is_empty()).then_some(self.think_text.as_str())
    }

    /// Total blocks in the program, nested ones included
    pub fn block_count(&self) -> usize {
        self.blocks.iter().map(Block::tree_size).sum()
    }
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct Stage {
    /// Sprites in creation order
    sprites: Vec<Sprite>,
    /// Sprite whose program the editor shows
    active: SpriteId,
    playing: bool,
    collision_locks: HashSet<LockKey>,
    /// Spawn positions for new sprites
    rng: Pcg32,
    spawn_half_extent: f32,
    next_sprite: u32,
}

impl Stage {
    /// New stage holding one sprite ("Cat") at the origin
    pub fn new(seed: u64) -> Self {
        Self::with_spawn_extent(seed, SPAWN_HALF_EXTENT)
    }

    pub fn with_spawn_extent(seed: u64, spawn_half_extent: f32) -> Self {
        let first = SpriteId(1);
        Self {
            sprites: vec![Sprite::new(first, "Cat", Vec2::ZERO)],
            active: first,
            playing: false,
            collision_locks: HashSet::new(),
            rng: Pcg32::seed_from_u64(seed),
            spawn_half_extent,
            next_sprite: 2,
        }
    }

    /// Allocate the next sprite ID
    fn next_sprite_id(&mut self) -> SpriteId {
        let id = SpriteId(self.next_sprite);
        self.next_sprite += 1;
        id
    }

    /// Add a sprite at a random position inside the spawn area
    pub fn add_sprite(&mut self) -> SpriteId {
        let id = self.next_sprite_id();
        let extent = self.spawn_half_extent;
        let position = Vec2::new(
            self.rng.random_range(-extent..extent),
            self.rng.random_range(-extent..extent),
        );
        let sprite = Sprite::new(id, format!("Sprite {}", id.0), position);
        log::debug!("Added {} at ({:.1}, {:.1})", id, position.x, position.y);
        self.sprites.push(sprite);
        id
    }

    pub fn select_sprite(&mut self, id: SpriteId) -> Result<()> {
        if self.sprite(id).is_none() {
            return Err(SandboxError::SpriteNotFound(id));
        }
        self.active = id;
        Ok(())
    }

    pub fn active_sprite_id(&self) -> SpriteId {
        self.active
    }

    pub fn active_sprite(&self) -> Option<&Sprite> {
        self.sprite(self.active)
    }

    pub fn sprite_ids(&self) -> Vec<SpriteId> {
        self.sprites.iter().map(|s| s.id).collect()
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.iter_mut().find(|s| s.id == id)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    // === Program editing (active sprite) ===

    fn active_program(&mut self) -> Result<&mut Vec<Block>> {
        let id = self.active;
        self.sprite_mut(id)
            .map(|s| &mut s.blocks)
            .ok_or(SandboxError::SpriteNotFound(id))
    }

    /// Append a block to the active sprite's program
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        self.active_program()?.push(block);
        Ok(())
    }

    /// Remove a top-level block from the active sprite's program
    pub fn remove_block(&mut self, index: usize) -> Result<Block> {
        let program = self.active_program()?;
        check_index(index, program.len())?;
        Ok(program.remove(index))
    }

    /// Move a top-level block to a new position
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<()> {
        let program = self.active_program()?;
        check_index(from, program.len())?;
        check_index(to, program.len())?;
        let block = program.remove(from);
        program.insert(to, block);
        Ok(())
    }

    /// Edit an input on a top-level block. Returns false for names outside
    /// the block's schema.
    pub fn set_block_input(
        &mut self,
        index: usize,
        name: &str,
        value: impl Into<InputValue>,
    ) -> Result<bool> {
        let program = self.active_program()?;
        check_index(index, program.len())?;
        Ok(program[index].set_input(name, value))
    }

    /// Append a child to a top-level container block
    pub fn add_child(&mut self, index: usize, child: Block) -> Result<()> {
        let program = self.active_program()?;
        check_index(index, program.len())?;
        program[index].push_child(child)
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(SandboxError::IndexOutOfRange { index, len })
    }
}

impl StageActions for Stage {
    fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.id == id)
    }

    fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    fn collision_locks(&self) -> &HashSet<LockKey> {
        &self.collision_locks
    }

    fn set_sprite_running(&mut self, id: SpriteId, running: bool) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.is_running = running;
        }
    }

    fn update_sprite_position(&mut self, id: SpriteId, position: Vec2) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.position = position;
        }
    }

    fn update_sprite_rotation(&mut self, id: SpriteId, rotation: f32) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.rotation = rotation;
        }
    }

    fn set_say_text(&mut self, id: SpriteId, text: &str, duration_ms: Millis) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.say_text = text.to_string();
            sprite.say_duration_ms = duration_ms;
        }
    }

    fn clear_say_text(&mut self, id: SpriteId) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.say_text.clear();
            sprite.say_duration_ms = 0.0;
        }
    }

    fn set_think_text(&mut self, id: SpriteId, text: &str, duration_ms: Millis) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.think_text = text.to_string();
            sprite.think_duration_ms = duration_ms;
        }
    }

    fn clear_think_text(&mut self, id: SpriteId) {
        if let Some(sprite) = self.sprite_mut(id) {
            sprite.think_text.clear();
            sprite.think_duration_ms = 0.0;
        }
    }

    fn swap_sprite_blocks(&mut self, a: SpriteId, b: SpriteId) {
        if a == b {
            return;
        }
        let ia = self.sprites.iter().position(|s| s.id == a);
        let ib = self.sprites.iter().position(|s| s.id == b);
        if let (Some(ia), Some(ib)) = (ia, ib) {
            let taken = std::mem::take(&mut self.sprites[ia].blocks);
            self.sprites[ia].blocks = std::mem::replace(&mut self.sprites[ib].blocks, taken);
        }
    }

    fn add_collision_lock(&mut self, key: LockKey) {
        self.collision_locks.insert(key);
    }

    fn remove_collision_lock(&mut self, key: LockKey) {
        self.collision_locks.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;

    #[test]
    fn test_new_stage_has_active_cat() {
        let stage = Stage::new(12345);
        assert_eq!(stage.sprites().len(), 1);
        let cat = stage.active_sprite().unwrap();
        assert_eq!(cat.name, "Cat");
        assert_eq!(cat.position, Vec2::ZERO);
        assert!(!cat.is_running);
        assert!(!stage.is_playing());
    }

    #[test]
    fn test_add_sprite_spawns_inside_area() {
        let mut stage = Stage::new(7);
        for _ in 0..20 {
            let id = stage.add_sprite();
            let sprite = stage.sprite(id).unwrap();
            assert!(sprite.position.x >= -100.0 && sprite.position.x < 100.0);
            assert!(sprite.position.y >= -100.0 && sprite.position.y < 100.0);
        }
        assert_eq!(stage.sprites().len(), 21);
        assert_eq!(stage.sprites()[1].id, SpriteId(2));
        assert_eq!(stage.sprites()[1].name, "Sprite 2");
    }

    #[test]
    fn test_spawn_is_deterministic_per_seed() {
        let mut a = Stage::new(99);
        let mut b = Stage::new(99);
        let (ia, ib) = (a.add_sprite(), b.add_sprite());
        assert_eq!(a.sprite(ia).unwrap().position, b.sprite(ib).unwrap().position);
    }

    #[test]
    fn test_select_unknown_sprite() {
        let mut stage = Stage::new(1);
        let err = stage.select_sprite(SpriteId(42)).unwrap_err();
        assert!(matches!(err, SandboxError::SpriteNotFound(SpriteId(42))));
        assert_eq!(stage.active_sprite_id(), SpriteId(1));
    }

    #[test]
    fn test_editing_targets_active_sprite() {
        let mut stage = Stage::new(1);
        let second = stage.add_sprite();
        stage.select_sprite(second).unwrap();

        stage.add_block(Block::new(BlockKind::MoveSteps)).unwrap();
        stage.add_block(Block::new(BlockKind::Repeat)).unwrap();
        stage.add_block(Block::new(BlockKind::Say)).unwrap();
        stage.add_child(1, Block::new(BlockKind::TurnDegrees)).unwrap();
        assert!(stage.set_block_input(0, "steps", 30).unwrap());
        assert!(!stage.set_block_input(0, "bogus", 30).unwrap());

        stage.move_block(2, 0).unwrap();
        let kinds: Vec<_> = stage.active_sprite().unwrap().blocks.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BlockKind::Say, BlockKind::MoveSteps, BlockKind::Repeat]);
        assert_eq!(stage.active_sprite().unwrap().block_count(), 4);

        let removed = stage.remove_block(0).unwrap();
        assert_eq!(removed.kind, BlockKind::Say);
        assert!(stage.sprite(SpriteId(1)).unwrap().blocks.is_empty());

        assert!(matches!(
            stage.remove_block(9),
            Err(SandboxError::IndexOutOfRange { index: 9, len: 2 })
        ));
        assert!(matches!(
            stage.add_child(0, Block::new(BlockKind::Say)),
            Err(SandboxError::NotAContainer(_))
        ));
    }

    #[test]
    fn test_swap_exchanges_programs() {
        let mut stage = Stage::new(1);
        let other = stage.add_sprite();
        stage.add_block(Block::new(BlockKind::MoveSteps)).unwrap();
        stage.select_sprite(other).unwrap();
        stage.add_block(Block::new(BlockKind::Say)).unwrap();
        stage.add_block(Block::new(BlockKind::Think)).unwrap();

        stage.swap_sprite_blocks(SpriteId(1), other);
        assert_eq!(stage.sprite(SpriteId(1)).unwrap().blocks.len(), 2);
        assert_eq!(stage.sprite(other).unwrap().blocks[0].kind, BlockKind::MoveSteps);

        // Unknown partner leaves both untouched
        stage.swap_sprite_blocks(SpriteId(1), SpriteId(77));
        assert_eq!(stage.sprite(SpriteId(1)).unwrap().blocks.len(), 2);
    }

    #[test]
    fn test_bubbles_set_and_clear() {
        let mut stage = Stage::new(1);
        let id = SpriteId(1);
        stage.set_say_text(id, "Hi", 2000.0);
        stage.set_think_text(id, "Hmm", 500.0);
        assert_eq!(stage.sprite(id).unwrap().speech(), Some("Hi"));
        assert_eq!(stage.sprite(id).unwrap().thought(), Some("Hmm"));

        stage.clear_say_text(id);
        stage.clear_think_text(id);
        let sprite = stage.sprite(id).unwrap();
        assert_eq!(sprite.speech(), None);
        assert_eq!(sprite.thought(), None);
        assert_eq!(sprite.say_duration_ms, 0.0);
    }
}

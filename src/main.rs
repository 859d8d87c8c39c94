//! Blockstage headless runner
//!
//! Builds a small two-sprite scene, plays it on a virtual clock and prints
//! where everything ended up. Pass a settings file path to override timings.

use glam::Vec2;

use blockstage::consts::FRAME_DT_MS;
use blockstage::{Block, BlockKind, Playback, PlaybackSettings, Result, Stage, StageActions, create_block};

/// Give up after this many frames (10 minutes of virtual time)
const MAX_FRAMES: u32 = 60 * 60 * 10;

fn main() {
    env_logger::init();
    log::info!("Blockstage (native) starting...");

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => PlaybackSettings::load(path),
        None => PlaybackSettings::default(),
    };

    let mut stage = build_scene(settings.spawn_half_extent)?;
    for sprite in stage.sprites() {
        println!("{} ({}):", sprite.name, sprite.id);
        for block in &sprite.blocks {
            print_block(block, 1);
        }
    }

    let mut playback = Playback::new(settings)?;
    let mut now = 0.0;
    playback.play(&mut stage, now);

    let mut frames = 0;
    while stage.is_playing() && frames < MAX_FRAMES {
        now += FRAME_DT_MS;
        frames += 1;
        playback.frame(&mut stage, now);
    }
    if stage.is_playing() {
        log::warn!("Frame cap reached, stopping playback");
        playback.stop(&mut stage, now);
    }
    log::info!("Playback finished after {} frames ({:.0} ms)", frames, now);

    println!();
    for sprite in stage.sprites() {
        println!(
            "{}: position ({:.1}, {:.1}) rotation {:.1} blocks {}",
            sprite.name,
            sprite.position.x,
            sprite.position.y,
            sprite.rotation,
            sprite.block_count()
        );
    }
    Ok(())
}

/// Two sprites walking toward each other; they trade programs when they meet
fn build_scene(spawn_half_extent: f32) -> Result<Stage> {
    let mut stage = Stage::with_spawn_extent(0x5eed, spawn_half_extent);
    let cat = stage.active_sprite_id();
    stage.update_sprite_position(cat, Vec2::new(-50.0, 0.0));

    let mut walk = create_block("repeat", [("times", 3)])?;
    walk.push_child(Block::new(BlockKind::MoveSteps))?;
    stage.add_block(walk)?;
    stage.add_block(create_block("say", [("text", "Bump!"), ("seconds", "1")])?)?;

    let dog = stage.add_sprite();
    stage.update_sprite_position(dog, Vec2::new(50.0, 0.0));
    stage.select_sprite(dog)?;
    stage.add_block(Block::with_inputs(BlockKind::TurnDegrees, [("degrees", 180)]))?;
    let mut walk = Block::with_inputs(BlockKind::Repeat, [("times", 3)]);
    walk.push_child(Block::new(BlockKind::MoveSteps))?;
    stage.add_block(walk)?;
    stage.add_block(Block::new(BlockKind::Think))?;

    stage.select_sprite(cat)?;
    Ok(stage)
}

fn print_block(block: &Block, depth: usize) {
    println!(
        "{:indent$}{} [{}]",
        "",
        block.render_text(),
        block.definition().category.as_str(),
        indent = depth * 2
    );
    for child in block.children().unwrap_or_default() {
        print_block(child, depth + 1);
    }
}

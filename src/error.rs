use thiserror::Error;

use crate::blocks::{BlockId, BlockKind};
use crate::sim::SpriteId;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Unknown block kind: {0}")]
    UnknownBlockKind(String),

    #[error("Sprite not found: {0}")]
    SpriteNotFound(SpriteId),

    #[error("Execution failed for {sprite}: {reason}")]
    ExecutionFailure { sprite: SpriteId, reason: String },

    #[error("Block {block} input `{input}` is not a number: {value:?}")]
    MalformedInput {
        block: BlockId,
        input: String,
        value: String,
    },

    #[error("Block {block} does not match the {kind} schema")]
    SchemaMismatch { block: BlockId, kind: BlockKind },

    #[error("Block {0} is not a container")]
    NotAContainer(BlockId),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Settings serialization error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

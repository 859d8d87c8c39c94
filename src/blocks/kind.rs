//! Block kinds and palette categories

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SandboxError;

/// Palette category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockCategory {
    Motion,
    Looks,
}

impl BlockCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockCategory::Motion => "Motion",
            BlockCategory::Looks => "Looks",
        }
    }
}

/// Every block kind the sandbox knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    MoveSteps,
    TurnDegrees,
    GoToXy,
    /// Container: runs its children `times` times
    Repeat,
    Say,
    Think,
}

impl BlockKind {
    /// Palette order
    pub const ALL: [BlockKind; 6] = [
        BlockKind::MoveSteps,
        BlockKind::TurnDegrees,
        BlockKind::GoToXy,
        BlockKind::Repeat,
        BlockKind::Say,
        BlockKind::Think,
    ];

    /// Stable wire name used by the editor
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::MoveSteps => "move_steps",
            BlockKind::TurnDegrees => "turn_degrees",
            BlockKind::GoToXy => "go_to_xy",
            BlockKind::Repeat => "repeat",
            BlockKind::Say => "say",
            BlockKind::Think => "think",
        }
    }

    pub fn category(&self) -> BlockCategory {
        match self {
            BlockKind::MoveSteps | BlockKind::TurnDegrees | BlockKind::GoToXy | BlockKind::Repeat => {
                BlockCategory::Motion
            }
            BlockKind::Say | BlockKind::Think => BlockCategory::Looks,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, BlockKind::Repeat)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockKind {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SandboxError::UnknownBlockKind(s.to_string()))
    }
}

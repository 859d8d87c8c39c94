//! Static block catalog
//!
//! One definition per `BlockKind`, built at compile time.

use serde::{Deserialize, Serialize};

use super::block::InputValue;
use super::kind::{BlockCategory, BlockKind};

/// Type of value an input slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Text,
}

/// Compile-time default for an input slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputDefault {
    Number(f64),
    Text(&'static str),
}

/// One named input in a block's schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    pub value_type: ValueType,
    pub default: InputDefault,
}

impl InputSpec {
    const fn number(name: &'static str, default: f64) -> Self {
        Self {
            name,
            value_type: ValueType::Number,
            default: InputDefault::Number(default),
        }
    }

    const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            value_type: ValueType::Text,
            default: InputDefault::Text(default),
        }
    }

    /// Fresh owned value holding this slot's default
    pub fn default_value(&self) -> InputValue {
        match self.default {
            InputDefault::Number(n) => InputValue::Number(n),
            InputDefault::Text(t) => InputValue::Text(t.to_string()),
        }
    }
}

/// Static description of a block kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDefinition {
    pub kind: BlockKind,
    pub category: BlockCategory,
    /// Label with `{input}` placeholders
    pub text: &'static str,
    /// Palette colour tag for the renderer
    pub color: &'static str,
    /// Input schema, in display order
    pub inputs: &'static [InputSpec],
    pub is_container: bool,
}

impl BlockDefinition {
    pub fn input(&self, name: &str) -> Option<&'static InputSpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }

    pub fn input_names(&self) -> impl Iterator<Item = &'static str> {
        self.inputs.iter().map(|spec| spec.name)
    }
}

static DEFINITIONS: [BlockDefinition; 6] = [
    BlockDefinition {
        kind: BlockKind::MoveSteps,
        category: BlockCategory::Motion,
        text: "move {steps} steps",
        color: "blue",
        inputs: &[InputSpec::number("steps", 10.0)],
        is_container: false,
    },
    BlockDefinition {
        kind: BlockKind::TurnDegrees,
        category: BlockCategory::Motion,
        text: "turn {degrees} degrees",
        color: "blue",
        inputs: &[InputSpec::number("degrees", 15.0)],
        is_container: false,
    },
    BlockDefinition {
        kind: BlockKind::GoToXy,
        category: BlockCategory::Motion,
        text: "go to x: {x} y: {y}",
        color: "blue",
        inputs: &[InputSpec::number("x", 0.0), InputSpec::number("y", 0.0)],
        is_container: false,
    },
    BlockDefinition {
        kind: BlockKind::Repeat,
        category: BlockCategory::Motion,
        text: "repeat {times}",
        color: "orange",
        inputs: &[InputSpec::number("times", 10.0)],
        is_container: true,
    },
    BlockDefinition {
        kind: BlockKind::Say,
        category: BlockCategory::Looks,
        text: "say {text} for {seconds} seconds",
        color: "purple",
        inputs: &[InputSpec::text("text", "Hello!"), InputSpec::number("seconds", 2.0)],
        is_container: false,
    },
    BlockDefinition {
        kind: BlockKind::Think,
        category: BlockCategory::Looks,
        text: "think {text} for {seconds} seconds",
        color: "purple",
        inputs: &[InputSpec::text("text", "Hmm..."), InputSpec::number("seconds", 2.0)],
        is_container: false,
    },
];

/// Definition for a kind (every kind has one)
pub fn definition(kind: BlockKind) -> &'static BlockDefinition {
    match kind {
        BlockKind::MoveSteps => &DEFINITIONS[0],
        BlockKind::TurnDegrees => &DEFINITIONS[1],
        BlockKind::GoToXy => &DEFINITIONS[2],
        BlockKind::Repeat => &DEFINITIONS[3],
        BlockKind::Say => &DEFINITIONS[4],
        BlockKind::Think => &DEFINITIONS[5],
    }
}

/// Look up a definition by wire name (`"move_steps"`, ...)
pub fn get_definition(name: &str) -> Option<&'static BlockDefinition> {
    DEFINITIONS.iter().find(|def| def.kind.name() == name)
}

/// All definitions in palette order
pub fn palette() -> &'static [BlockDefinition] {
    &DEFINITIONS
}

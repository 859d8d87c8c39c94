//! Block instances
//!
//! A block is a node in a sprite's program. Containers (`repeat`) own their
//! children exclusively; there is no sharing between trees.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::definition::{BlockDefinition, ValueType, definition};
use super::kind::BlockKind;
use super::template::render_template;
use crate::error::{Result, SandboxError};

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl BlockId {
    fn next() -> Self {
        Self(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// Current value of an input slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Number(f64),
    Text(String),
}

impl InputValue {
    /// Numeric reading; text is parsed the way an edited field would be
    pub fn as_number(&self) -> Option<f64> {
        match self {
            InputValue::Number(n) => Some(*n),
            InputValue::Text(t) => t.trim().parse().ok(),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Number(n) => write!(f, "{n}"),
            InputValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Number(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Number(value as f64)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Text(value)
    }
}

/// An input slot on an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub value_type: ValueType,
    pub value: InputValue,
}

/// A block in a sprite program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockRecord")]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Exactly the definition's schema keys
    inputs: BTreeMap<String, Input>,
    /// Present iff the kind is a container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Block>>,
}

/// Unchecked wire form of a [`Block`]
#[derive(Deserialize)]
struct BlockRecord {
    id: BlockId,
    kind: BlockKind,
    inputs: BTreeMap<String, Input>,
    #[serde(default)]
    children: Option<Vec<Block>>,
}

impl TryFrom<BlockRecord> for Block {
    type Error = SandboxError;

    fn try_from(record: BlockRecord) -> Result<Self> {
        let def = definition(record.kind);
        let schema_matches = record.inputs.len() == def.inputs.len()
            && def.input_names().all(|name| record.inputs.contains_key(name));
        if !schema_matches {
            return Err(SandboxError::SchemaMismatch {
                block: record.id,
                kind: record.kind,
            });
        }

        let children = match (def.is_container, record.children) {
            (true, children) => Some(children.unwrap_or_default()),
            (false, None) => None,
            (false, Some(_)) => return Err(SandboxError::NotAContainer(record.id)),
        };

        Ok(Self {
            id: record.id,
            kind: record.kind,
            inputs: record.inputs,
            children,
        })
    }
}

impl Block {
    /// Fresh block with default inputs
    pub fn new(kind: BlockKind) -> Self {
        let def = definition(kind);
        let inputs = def
            .inputs
            .iter()
            .map(|spec| {
                (
                    spec.name.to_string(),
                    Input {
                        value_type: spec.value_type,
                        value: spec.default_value(),
                    },
                )
            })
            .collect();

        Self {
            id: BlockId::next(),
            kind,
            inputs,
            children: def.is_container.then(Vec::new),
        }
    }

    /// Fresh block with defaults replaced by any matching overrides.
    /// Override keys outside the schema are ignored.
    pub fn with_inputs<I, K, V>(kind: BlockKind, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<InputValue>,
    {
        let mut block = Self::new(kind);
        for (name, value) in overrides {
            block.set_input(name.as_ref(), value);
        }
        block
    }

    pub fn definition(&self) -> &'static BlockDefinition {
        definition(self.kind)
    }

    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    pub fn input(&self, name: &str) -> Option<&InputValue> {
        self.inputs.get(name).map(|input| &input.value)
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    /// Replace an input's value. Returns false (and changes nothing) for
    /// names outside the schema.
    pub fn set_input(&mut self, name: &str, value: impl Into<InputValue>) -> bool {
        match self.inputs.get_mut(name) {
            Some(input) => {
                input.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Read a numeric input
    pub fn number(&self, name: &str) -> Result<f64> {
        let value = self.input(name);
        value
            .and_then(InputValue::as_number)
            .ok_or_else(|| SandboxError::MalformedInput {
                block: self.id,
                input: name.to_string(),
                value: value.map(ToString::to_string).unwrap_or_default(),
            })
    }

    /// Read an input as display text
    pub fn text(&self, name: &str) -> String {
        self.input(name).map(ToString::to_string).unwrap_or_default()
    }

    pub fn children(&self) -> Option<&[Block]> {
        self.children.as_deref()
    }

    /// Append a child to a container
    pub fn push_child(&mut self, child: Block) -> Result<()> {
        let id = self.id;
        self.children
            .as_mut()
            .ok_or(SandboxError::NotAContainer(id))?
            .push(child);
        Ok(())
    }

    /// Remove a container's child by position
    pub fn remove_child(&mut self, index: usize) -> Result<Block> {
        let id = self.id;
        let children = self.children.as_mut().ok_or(SandboxError::NotAContainer(id))?;
        if index >= children.len() {
            return Err(SandboxError::IndexOutOfRange {
                index,
                len: children.len(),
            });
        }
        Ok(children.remove(index))
    }

    /// Deep copy with fresh ids throughout (palette drag-out)
    pub fn duplicate(&self) -> Self {
        Self {
            id: BlockId::next(),
            kind: self.kind,
            inputs: self.inputs.clone(),
            children: self
                .children
                .as_ref()
                .map(|children| children.iter().map(Block::duplicate).collect()),
        }
    }

    /// Label with current input values substituted
    pub fn render_text(&self) -> String {
        render_template(self.definition().text, |name| {
            self.input(name).map(ToString::to_string)
        })
    }

    /// Number of blocks in this subtree, self included
    pub fn tree_size(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map(|children| children.iter().map(Block::tree_size).sum())
            .unwrap_or(0)
    }
}

/// Create a block by wire name, applying overrides on top of defaults.
///
/// Fails with `UnknownBlockKind` if the name is not in the catalog.
pub fn create_block<I, K, V>(name: &str, overrides: I) -> Result<Block>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<InputValue>,
{
    let kind: BlockKind = name
        .parse()
        .inspect_err(|e| log::warn!("Cannot create block: {}", e))?;
    Ok(Block::with_inputs(kind, overrides))
}

//! Block model
//!
//! The fixed catalog of block kinds, the instances users assemble into
//! sprite programs, and the text templates the palette displays.

pub mod block;
pub mod definition;
pub mod kind;
pub mod template;

pub use block::{Block, BlockId, Input, InputValue, create_block};
pub use definition::{BlockDefinition, InputDefault, InputSpec, ValueType, definition, get_definition, palette};
pub use kind::{BlockCategory, BlockKind};
pub use template::render_template;

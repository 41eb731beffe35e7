//! Circular model: tables, keys, and the bidirectional relation graph between them

mod abbreviator;
mod builder;
mod circular_model;
mod elements;
mod relations;

pub use abbreviator::abbreviate;
pub use circular_model::CircularModel;
pub use elements::*;
pub use relations::{EndSpec, RelationEnd, RelationEndId, RelationSpec};

//! Query generation: extent trees to SQL, and query results back to entities

pub mod entity;
pub mod materialize;
pub mod sql;

pub use entity::{dummy_entity, Entity, RelatedEntities};
pub use materialize::{make_entities, make_entity, QueryResult};
pub use sql::{get_sql, FINGERPRINT_ATTRIBUTE, MATCHING_COLUMN};

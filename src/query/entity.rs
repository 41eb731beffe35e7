//! Query results: entities and their related entity lists

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::extent::Extent;
use crate::model::{CircularModel, RelationEndId, TableId};

use super::sql::{child_aliases, resolve_relation};

/// One row, with the related rows fetched for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    /// Values of the extent's columns and selectables; `None` is NULL.
    pub values: BTreeMap<String, Option<String>>,
    /// Whether the row matched every filter value. Only set for filtered extents.
    pub is_matching: Option<bool>,
    /// Aligned with the extent's children.
    pub related: Vec<RelatedEntities>,
}

/// The rows reached through one child extent.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntities {
    /// Relation name of the child extent.
    pub name: String,
    /// Alias the child's rows were serialized under.
    pub alias: String,
    pub end: RelationEndId,
    pub entities: Vec<Entity>,
}

impl Entity {
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }

    pub fn related(&self, name: &str) -> Option<&RelatedEntities> {
        self.related.iter().find(|r| r.name == name)
    }

    /// Flatten to `{"columns": {...}, "relations": {name: [...]}}` for debugging.
    pub fn to_debug_json(&self) -> Value {
        let columns: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().map(Value::String).unwrap_or(Value::Null)))
            .collect();
        let mut relations = Map::new();
        for related in &self.related {
            let key = if relations.contains_key(&related.name) {
                format!("{} ({})", related.name, related.alias)
            } else {
                related.name.clone()
            };
            let entities: Vec<Value> = related.entities.iter().map(Entity::to_debug_json).collect();
            relations.insert(key, Value::Array(entities));
        }
        json!({ "columns": columns, "relations": relations })
    }
}

/// A value-free entity shaped exactly like what materializing `extent` would give:
/// every column present as NULL and one placeholder row per related list.
pub fn dummy_entity(model: &CircularModel, extent: &Extent) -> Result<Entity> {
    dummy_for(model, model.root_id(), "", extent)
}

fn dummy_for(model: &CircularModel, table: TableId, alias: &str, extent: &Extent) -> Result<Entity> {
    let values = extent
        .columns
        .iter()
        .chain(extent.selectables.iter().map(|s| &s.name))
        .map(|name| (name.clone(), None))
        .collect();

    let aliases = child_aliases(model, table, alias, &extent.children)?;
    let mut related = Vec::with_capacity(extent.children.len());
    for (child, child_alias) in extent.children.iter().zip(aliases) {
        let end = resolve_relation(model, table, child)?;
        let target = model.target_table(end.id).id;
        related.push(RelatedEntities {
            name: child.relation.clone().unwrap_or_default(),
            entities: vec![dummy_for(model, target, &child_alias, child)?],
            alias: child_alias,
            end: end.id,
        });
    }

    Ok(Entity {
        values,
        is_matching: None,
        related,
    })
}

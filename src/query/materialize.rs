//! Rebuild entities from the XML a compiled extent query returns
//!
//! The document mirrors the extent tree: a `root` element carrying the fingerprint,
//! and below every row element one element per related row, named after the child
//! extent's alias. Attribute and element names use the database's XML name encoding.

use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{BrowseError, Result};
use crate::extent::Extent;
use crate::model::{CircularModel, TableId};
use crate::names::{decode_name, encode_name};

use super::entity::{Entity, RelatedEntities};
use super::sql::{child_aliases, resolve_relation, FINGERPRINT_ATTRIBUTE, MATCHING_COLUMN};

/// Materialized result of one root extent.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Schema fingerprint at query time.
    pub fingerprint: Option<String>,
    /// The root row; its related lists hold the top-level results.
    pub root: Entity,
}

impl QueryResult {
    /// Rows of a top-level relation.
    pub fn entities(&self, relation: &str) -> &[Entity] {
        self.root
            .related(relation)
            .map(|r| r.entities.as_slice())
            .unwrap_or_default()
    }
}

/// Parse a query result and rebuild its entity tree along `root`.
pub fn make_entities(model: &CircularModel, root: &Extent, xml: &str) -> Result<QueryResult> {
    let doc = Document::parse(xml)?;
    let element = doc.root_element();
    if element.tag_name().name() != "root" {
        return Err(BrowseError::UnexpectedResult {
            message: format!("expected <root>, found <{}>", element.tag_name().name()),
        });
    }

    let fingerprint = element.attribute(FINGERPRINT_ATTRIBUTE).map(str::to_string);
    let entity = make_entity(model, model.root_id(), "", root, element)?;
    debug!(
        top_level = entity.related.iter().map(|r| r.entities.len()).sum::<usize>(),
        "materialized query result"
    );
    Ok(QueryResult {
        fingerprint,
        root: entity,
    })
}

/// Build one entity from its row element. `table` is the table the row belongs to
/// and `alias` the alias it was selected under.
pub fn make_entity(
    model: &CircularModel,
    table: TableId,
    alias: &str,
    extent: &Extent,
    node: Node,
) -> Result<Entity> {
    let attributes: HashMap<String, &str> = node
        .attributes()
        .map(|a| (decode_name(a.name()), a.value()))
        .collect();

    // Missing attributes are NULL columns.
    let values = extent
        .columns
        .iter()
        .chain(extent.selectables.iter().map(|s| &s.name))
        .map(|name| (name.clone(), attributes.get(name).map(|v| v.to_string())))
        .collect();

    let is_matching = if extent.values.is_empty() || extent.is_root() {
        None
    } else {
        Some(attributes.get(MATCHING_COLUMN).is_some_and(|v| *v == "1"))
    };

    let aliases = child_aliases(model, table, alias, &extent.children)?;
    let mut related = Vec::with_capacity(extent.children.len());
    for (child, child_alias) in extent.children.iter().zip(aliases) {
        let end = resolve_relation(model, table, child)?;
        let target = model.target_table(end.id).id;
        let element_name = encode_name(&child_alias);
        let entities = node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == element_name)
            .map(|n| make_entity(model, target, &child_alias, child, n))
            .collect::<Result<Vec<_>>>()?;
        related.push(RelatedEntities {
            name: child.relation.clone().unwrap_or_default(),
            alias: child_alias,
            end: end.id,
            entities,
        });
    }

    Ok(Entity {
        values,
        is_matching,
        related,
    })
}

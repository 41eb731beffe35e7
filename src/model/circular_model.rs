//! The built circular model and its read-only lookups

use std::collections::HashMap;

use crate::catalog::CatalogSchema;
use crate::error::{BrowseError, Result};
use crate::names::ObjectName;
use crate::BrowseOptions;

use super::builder::ModelBuilder;
use super::{ColumnTuple, RelationEnd, RelationEndId, Table, TableId};

/// Tables, keys and relation ends of one schema snapshot.
///
/// Tables and relation ends live in arenas and refer to each other by id. Once built
/// the model is never mutated; a schema change produces a new model.
#[derive(Debug, Clone)]
pub struct CircularModel {
    pub(crate) tables: Vec<Table>,
    pub(crate) ends: Vec<RelationEnd>,
    pub(crate) root: TableId,
    pub(crate) table_by_name: HashMap<String, TableId>,
    pub(crate) fingerprint: Option<String>,
}

impl CircularModel {
    /// Build a model from catalog metadata.
    pub fn build(catalog: &CatalogSchema, options: &BrowseOptions) -> Result<Self> {
        let mut builder = ModelBuilder::new(options);
        let keys = builder.populate_tables(catalog)?;
        builder.populate_foreign_keys(catalog, &keys)?;
        builder.populate_root()?;
        builder.populate_relations_from_foreign_keys()?;
        builder.closeup();
        Ok(builder.finish(catalog.fingerprint.clone()))
    }

    pub fn root_table(&self) -> &Table {
        &self.tables[self.root.0]
    }

    pub fn root_id(&self) -> TableId {
        self.root
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    /// Real tables, in catalog order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| !t.is_root())
    }

    pub fn end(&self, id: RelationEndId) -> &RelationEnd {
        &self.ends[id.0]
    }

    pub fn other_end(&self, id: RelationEndId) -> &RelationEnd {
        self.end(self.end(id).other)
    }

    /// The table a relation end leads to.
    pub fn target_table(&self, id: RelationEndId) -> &Table {
        self.table(self.other_end(id).table)
    }

    /// The column tuple a relation end is anchored on.
    pub fn end_tuple(&self, id: RelationEndId) -> Result<&ColumnTuple> {
        let end = self.end(id);
        let table = self.table(end.table);
        table
            .column_tuple(&end.key)
            .ok_or_else(|| BrowseError::UnresolvedKey {
                table: table.name.simple().to_string(),
                key: end.key.name().to_string(),
            })
    }

    /// Schema fingerprint the model was built from.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// True when a freshly read fingerprint says this model is out of date.
    pub fn is_stale(&self, current_fingerprint: Option<&str>) -> bool {
        self.fingerprint.as_deref() != current_fingerprint
    }

    /// Find a table by simple name (`dbo.customer`) or escaped name (`[dbo].[customer]`).
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        if let Some(id) = self.table_by_name.get(name) {
            return Some(self.table(*id));
        }
        let parsed = ObjectName::parse(name).ok()?;
        self.table_by_name
            .get(parsed.simple())
            .map(|id| self.table(*id))
    }

    pub fn require_table(&self, name: &str) -> Result<&Table> {
        self.find_table(name)
            .ok_or_else(|| BrowseError::UnresolvedTable {
                name: name.to_string(),
            })
    }

    /// Resolve a named outgoing relation of a table.
    pub fn relation(&self, table: TableId, name: &str) -> Result<&RelationEnd> {
        let owner = self.table(table);
        owner
            .relations
            .get(name)
            .map(|id| self.end(*id))
            .ok_or_else(|| BrowseError::UnresolvedRelation {
                relation: name.to_string(),
                table: owner.name.simple().to_string(),
            })
    }

    /// Following this end yields possibly many rows.
    pub fn navigates_to_many(&self, id: RelationEndId) -> bool {
        self.other_end(id).is_many
    }

    /// This end is the only to-many relation from its table to the target table.
    pub fn is_uniquely_typed(&self, id: RelationEndId) -> bool {
        let end = self.end(id);
        let target = self.other_end(id).table;
        let Some(group) = self.table(end.table).relations_by_target.get(&target) else {
            return false;
        };
        let many: Vec<_> = group
            .iter()
            .filter(|e| self.navigates_to_many(**e))
            .collect();
        many.len() == 1 && *many[0] == id
    }

    /// The relation from the root table to a table.
    pub fn root_relation_to(&self, table: TableId) -> Result<&RelationEnd> {
        let name = self.table(table).name.simple().to_string();
        self.relation(self.root, &name)
    }
}

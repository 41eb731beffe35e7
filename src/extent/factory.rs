//! Extent factory: bounded expansion of the relation graph
//!
//! Expansion is a depth-first walk. The ends on the current path are kept on a stack
//! (pushed before descending, popped on return), so a relation end may reappear on a
//! sibling branch but never below itself. Flavor reduction bounds the depth on its
//! own; the path guard keeps self-referencing keys from repeating along one path.

use tracing::{trace, warn};

use crate::catalog::IndexDirection;
use crate::error::{BrowseError, Result};
use crate::model::{CircularModel, Indexlike, RelationEndId, Table, TableId, TupleRef};
use crate::BrowseOptions;

use super::{Extent, Flavor, FlavorType, OrderColumn, Scan};

/// Caller parameters for the extent of one table.
#[derive(Debug, Clone)]
pub struct ExtentRequest {
    /// Simple or escaped table name.
    pub table: String,
    pub flavor: Flavor,
    /// Index to order by and force.
    pub index: Option<String>,
    /// Explicit ordering; takes precedence over `index` for the `order by`.
    pub order: Vec<OrderColumn>,
    pub values: Vec<Option<String>>,
    pub key_value_count: usize,
    pub scan: Option<String>,
    pub limit: Option<usize>,
}

impl ExtentRequest {
    pub fn new(table: impl Into<String>, flavor: Flavor) -> Self {
        Self {
            table: table.into(),
            flavor,
            index: None,
            order: Vec::new(),
            values: Vec::new(),
            key_value_count: 0,
            scan: None,
            limit: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_order(mut self, order: Vec<OrderColumn>) -> Self {
        self.order = order;
        self
    }

    pub fn with_values(mut self, values: Vec<Option<String>>, key_value_count: usize) -> Self {
        self.values = values;
        self.key_value_count = key_value_count;
        self
    }

    pub fn with_scan(mut self, value: impl Into<String>) -> Self {
        self.scan = Some(value.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Builds extent trees over one model.
///
/// Holds the path stack of the expansion in progress, so one factory must not be
/// used by several builds at once.
pub struct ExtentFactory<'m> {
    model: &'m CircularModel,
    default_limit: Option<usize>,
    path: Vec<RelationEndId>,
}

impl<'m> ExtentFactory<'m> {
    pub fn new(model: &'m CircularModel, options: &BrowseOptions) -> Self {
        Self {
            model,
            default_limit: options.default_limit,
            path: Vec::new(),
        }
    }

    /// The overview extent: one child per table, each at `flavor`.
    pub fn create_extent_for_root(&mut self, flavor: Flavor) -> Result<Extent> {
        let model = self.model;
        let mut root = Extent::root(flavor);
        for &end in model.root_table().relations.values() {
            let child = self.create_extent(end, flavor, None)?;
            root.children.push(child);
        }
        Ok(root)
    }

    /// A root extent holding the single hop from the root table to the requested
    /// table, shaped by the request.
    pub fn create_root_extent(&mut self, request: &ExtentRequest) -> Result<Extent> {
        let model = self.model;
        let table = model.require_table(&request.table)?;
        let end = model.root_relation_to(table.id)?.id;
        let child = self.create_extent(end, request.flavor, Some(request))?;
        Ok(Extent::root(request.flavor).with_child(child))
    }

    /// A childless, unlimited extent over `relation` of `parent` with all columns and
    /// the default ordering.
    pub fn plain_extent(&self, parent: TableId, relation: &str) -> Result<Extent> {
        let end = self.model.relation(parent, relation)?;
        let target = self.model.target_table(end.id);
        let mut extent = Extent::for_relation(relation, Flavor::new(FlavorType::Table, 0))
            .with_columns(target.columns.iter().map(|c| c.name.clone()));
        extent.order = default_order(self.model, end.id);
        Ok(extent)
    }

    fn create_extent(
        &mut self,
        end_id: RelationEndId,
        flavor: Flavor,
        request: Option<&ExtentRequest>,
    ) -> Result<Extent> {
        let model = self.model;
        let end = model.end(end_id);
        let target = model.target_table(end_id);
        let relation = end.name.clone().unwrap_or_default();

        let mut extent = Extent::for_relation(relation, flavor)
            .with_columns(target.columns.iter().map(|c| c.name.clone()));
        extent.limit = Some(
            request
                .and_then(|r| r.limit)
                .unwrap_or_else(|| flavor.limit(self.default_limit)),
        );
        match request {
            Some(request) => apply_request(model, &mut extent, target, end_id, request)?,
            None => extent.order = default_order(model, end_id),
        }

        self.path.push(end_id);
        let expanded = self.expand_children(&mut extent, target, flavor);
        self.path.pop();
        expanded?;

        trace!(
            relation = extent.relation.as_deref().unwrap_or(""),
            %flavor,
            children = extent.children.len(),
            "created extent"
        );
        Ok(extent)
    }

    fn expand_children(&mut self, extent: &mut Extent, table: &Table, flavor: Flavor) -> Result<()> {
        let model = self.model;
        for &child in table.relations.values() {
            if self.path.contains(&child) {
                continue;
            }
            let Some(child_flavor) =
                flavor.reduce(model.navigates_to_many(child), model.is_uniquely_typed(child))
            else {
                continue;
            };
            let child_extent = self.create_extent(child, child_flavor, None)?;
            extent.children.push(child_extent);
        }
        Ok(())
    }
}

fn apply_request(
    model: &CircularModel,
    extent: &mut Extent,
    target: &Table,
    end_id: RelationEndId,
    request: &ExtentRequest,
) -> Result<()> {
    for item in &request.order {
        if target.column(&item.name).is_none() {
            return Err(BrowseError::UnresolvedColumn {
                table: target.name.simple().to_string(),
                column: item.name.clone(),
            });
        }
    }

    let forced = match &request.index {
        Some(name) => {
            let index = target.index(name).ok_or_else(|| BrowseError::UnresolvedKey {
                table: target.name.simple().to_string(),
                key: name.clone(),
            })?;
            if let Some(reason) = &index.unsupported {
                warn!(table = %target.name, index = %name, %reason, "forcing an index that can't be used for seeking");
            }
            Some(index)
        }
        None => None,
    };

    extent.order = if !request.order.is_empty() {
        request.order.clone()
    } else if let Some(index) = forced {
        index_order(target, index)
    } else {
        default_order(model, end_id)
    };
    extent.index = request.index.clone();
    extent.values = request.values.clone();
    extent.key_value_count = request.key_value_count;
    extent.scan = request.scan.as_deref().map(|v| Scan::for_table(target, v));
    Ok(())
}

/// Order by the key the target side of the hop is anchored on, falling back to the
/// primary key and then the first usable index.
fn default_order(model: &CircularModel, end_id: RelationEndId) -> Vec<OrderColumn> {
    let other = model.other_end(end_id);
    let target = model.table(other.table);
    let usable = |i: &&Indexlike| i.is_supported() && !i.tuple.columns.is_empty();

    let own = match &other.key {
        TupleRef::Index(name) => target.index(name),
        TupleRef::ForeignKey(name) => target.foreign_key(name).and_then(|fk| {
            fk.backing_indexes
                .iter()
                .filter_map(|n| target.index(n))
                .find(|i| i.is_supported())
        }),
    };

    own.filter(usable)
        .or_else(|| target.primary_index().filter(usable))
        .or_else(|| target.seekable_indexes().next())
        .map(|index| index_order(target, index))
        .unwrap_or_default()
}

fn index_order(table: &Table, index: &Indexlike) -> Vec<OrderColumn> {
    index
        .tuple
        .columns
        .iter()
        .map(|c| {
            let direction = match c.direction {
                IndexDirection::Unknown => IndexDirection::Ascending,
                direction => direction,
            };
            OrderColumn::new(table.columns[c.column].name.clone(), direction)
        })
        .collect()
}

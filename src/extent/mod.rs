//! Extents: declarative, bounded descriptions of what to fetch along relation hops
//!
//! An [`Extent`] names one relation to follow from its parent's table, what to select
//! there, how to order and filter, and which child hops to fetch for every row. The
//! root extent follows no relation and stands for the synthetic root table.

pub mod factory;
pub mod flavor;

pub use factory::{ExtentFactory, ExtentRequest};
pub use flavor::{next_flavor_type, Flavor, FlavorType};

use crate::catalog::IndexDirection;
use crate::model::Table;
use crate::types::ScanOption;

/// An `order by` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderColumn {
    pub name: String,
    pub direction: IndexDirection,
}

impl OrderColumn {
    pub fn new(name: impl Into<String>, direction: IndexDirection) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn ascending(name: impl Into<String>) -> Self {
        Self::new(name, IndexDirection::Ascending)
    }
}

/// One column's contribution to a free-text scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTerm {
    pub column: String,
    pub option: ScanOption,
}

/// A free-text search over the columns of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub value: String,
    /// Empty when no column can match the value; the query then matches nothing.
    pub terms: Vec<ScanTerm>,
}

impl Scan {
    /// Ask every column of `table` how it could match `value`.
    pub fn for_table(table: &Table, value: &str) -> Self {
        let terms = table
            .columns
            .iter()
            .filter_map(|c| {
                c.column_type.scan_option(value).map(|option| ScanTerm {
                    column: c.name.clone(),
                    option,
                })
            })
            .collect();
        Self {
            value: value.to_string(),
            terms,
        }
    }
}

/// An extra select-list expression. `{alias}` in the expression stands for the
/// extent's escaped table alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectable {
    pub name: String,
    pub expression: String,
}

impl Selectable {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    /// Relation followed from the parent's table; `None` only for the root extent.
    pub relation: Option<String>,
    /// Explicit table alias. Derived from the target table's name when absent.
    pub alias: Option<String>,
    pub flavor: Flavor,
    /// Index to force with a table hint.
    pub index: Option<String>,
    /// `None` fetches all matching rows.
    pub limit: Option<usize>,
    pub columns: Vec<String>,
    pub order: Vec<OrderColumn>,
    /// Seek position, aligned with `order`. `None` stands for NULL.
    pub values: Vec<Option<String>>,
    /// How many leading values are bound key components.
    pub key_value_count: usize,
    pub scan: Option<Scan>,
    pub children: Vec<Extent>,
    pub selectables: Vec<Selectable>,
}

impl Extent {
    pub fn root(flavor: Flavor) -> Self {
        Self::new(None, flavor)
    }

    pub fn for_relation(relation: impl Into<String>, flavor: Flavor) -> Self {
        Self::new(Some(relation.into()), flavor)
    }

    fn new(relation: Option<String>, flavor: Flavor) -> Self {
        Self {
            relation,
            alias: None,
            flavor,
            index: None,
            limit: None,
            columns: Vec::new(),
            order: Vec::new(),
            values: Vec::new(),
            key_value_count: 0,
            scan: None,
            children: Vec::new(),
            selectables: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.relation.is_none()
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_order(mut self, order: Vec<OrderColumn>) -> Self {
        self.order = order;
        self
    }

    /// Seek to `values`, the first `key_value_count` of which are bound keys.
    pub fn with_values(mut self, values: Vec<Option<String>>, key_value_count: usize) -> Self {
        self.values = values;
        self.key_value_count = key_value_count;
        self
    }

    pub fn with_selectable(mut self, selectable: Selectable) -> Self {
        self.selectables.push(selectable);
        self
    }

    pub fn with_child(mut self, child: Extent) -> Self {
        self.children.push(child);
        self
    }

    /// Every extent in the tree, depth first.
    pub fn walk(&self) -> Vec<&Extent> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    /// Relation hops on the longest path below this extent.
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }
}

//! Circular model element types

use std::collections::{BTreeMap, HashMap};

use crate::catalog::{IndexDirection, UnsupportedReason, UnsupportedTag};
use crate::names::ObjectName;
use crate::types::ColumnType;

use super::RelationEndId;

/// Stable handle of a table inside one circular model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

impl TableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Column element
#[derive(Debug, Clone)]
pub struct Column {
    /// 1-based position in the catalog, counting skipped columns.
    pub ordinal: usize,
    pub name: String,
    pub sql_type: String,
    pub is_nullable: bool,
    pub column_type: ColumnType,
    pub is_primary_name: bool,
}

impl Column {
    pub fn is_string(&self) -> bool {
        self.column_type.is_string()
    }
}

/// A column reference (by position in its table) plus a sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedColumn {
    pub column: usize,
    pub direction: IndexDirection,
}

/// Ordered columns of a key, index or foreign key.
#[derive(Debug, Clone)]
pub struct ColumnTuple {
    /// Empty for the synthetic root key and the root foreign key.
    pub name: String,
    pub table: TableId,
    pub columns: Vec<DirectedColumn>,
    /// The column set is a superset of some unique index's column set, so the tuple
    /// identifies at most one row.
    pub contains_key: bool,
}

impl ColumnTuple {
    pub fn column_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().map(|c| c.column)
    }
}

/// A key or index defined on the table itself.
#[derive(Debug, Clone)]
pub struct Indexlike {
    pub tuple: ColumnTuple,
    pub is_unique: bool,
    pub is_primary: bool,
    pub unsupported: Option<UnsupportedReason>,
}

impl Indexlike {
    pub fn name(&self) -> &str {
        &self.tuple.name
    }

    pub fn is_supported(&self) -> bool {
        self.unsupported.is_none()
    }

    /// Whether the database actually enforces uniqueness through this index.
    pub fn guarantees_uniqueness(&self) -> bool {
        self.is_unique
            && !matches!(
                self.unsupported.as_ref().map(|r| r.tag),
                Some(UnsupportedTag::Disabled)
                    | Some(UnsupportedTag::Filtered)
                    | Some(UnsupportedTag::Hypothetical)
            )
    }
}

/// Names the principal key of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRef {
    pub table: TableId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub tuple: ColumnTuple,
    pub principal: KeyRef,
    /// Indexes on this table whose leading columns are exactly the foreign key's columns.
    pub backing_indexes: Vec<String>,
}

impl ForeignKey {
    pub fn name(&self) -> &str {
        &self.tuple.name
    }

    /// The anonymous foreign key every real table has towards the root table.
    pub fn is_root_key(&self) -> bool {
        self.tuple.name.is_empty()
    }
}

/// Which of a table's column tuples a relation end is anchored on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TupleRef {
    Index(String),
    ForeignKey(String),
}

impl TupleRef {
    pub fn name(&self) -> &str {
        match self {
            TupleRef::Index(name) | TupleRef::ForeignKey(name) => name,
        }
    }
}

/// Table element
#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub name: ObjectName,
    pub is_view: bool,
    pub abbreviation: String,
    /// Color hint in degrees, derived from the abbreviation.
    pub hue: u16,
    pub columns: Vec<Column>,
    pub primary_key: Option<String>,
    /// All indexlikes in definition order.
    pub indexes: Vec<Indexlike>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Named outgoing relation ends.
    pub relations: BTreeMap<String, RelationEndId>,
    /// Outgoing relation ends grouped by the table they lead to.
    pub relations_by_target: BTreeMap<TableId, Vec<RelationEndId>>,
    pub primary_name_column: Option<usize>,
    pub(crate) column_by_name: HashMap<String, usize>,
    pub(crate) index_by_name: HashMap<String, usize>,
    pub(crate) foreign_key_by_name: HashMap<String, usize>,
}

impl Table {
    pub(crate) fn new(id: TableId, name: ObjectName) -> Self {
        Self {
            id,
            name,
            is_view: false,
            abbreviation: String::new(),
            hue: 0,
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            relations: BTreeMap::new(),
            relations_by_target: BTreeMap::new(),
            primary_name_column: None,
            column_by_name: HashMap::new(),
            index_by_name: HashMap::new(),
            foreign_key_by_name: HashMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_root()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_by_name.get(name).copied()
    }

    pub fn index(&self, name: &str) -> Option<&Indexlike> {
        self.index_by_name.get(name).map(|&i| &self.indexes[i])
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_key_by_name
            .get(name)
            .map(|&i| &self.foreign_keys[i])
    }

    pub fn unique_indexes(&self) -> impl Iterator<Item = &Indexlike> {
        self.indexes.iter().filter(|i| i.is_unique)
    }

    /// Indexes that can be offered as search paths.
    pub fn seekable_indexes(&self) -> impl Iterator<Item = &Indexlike> {
        self.indexes
            .iter()
            .filter(|i| i.is_supported() && !i.tuple.columns.is_empty())
    }

    pub fn primary_index(&self) -> Option<&Indexlike> {
        self.primary_key.as_deref().and_then(|name| self.index(name))
    }

    /// Every column tuple of the table: indexlikes first, then foreign keys.
    pub fn column_tuples(&self) -> impl Iterator<Item = &ColumnTuple> {
        self.indexes
            .iter()
            .map(|i| &i.tuple)
            .chain(self.foreign_keys.iter().map(|f| &f.tuple))
    }

    pub fn column_tuple(&self, key: &TupleRef) -> Option<&ColumnTuple> {
        match key {
            TupleRef::Index(name) => self.index(name).map(|i| &i.tuple),
            TupleRef::ForeignKey(name) => self.foreign_key(name).map(|f| &f.tuple),
        }
    }

    pub fn primary_name(&self) -> Option<&Column> {
        self.primary_name_column.map(|i| &self.columns[i])
    }

    pub fn column_names(&self, tuple: &ColumnTuple) -> Vec<&str> {
        tuple
            .columns
            .iter()
            .map(|c| self.columns[c.column].name.as_str())
            .collect()
    }
}

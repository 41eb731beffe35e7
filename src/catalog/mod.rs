//! Catalog metadata: the engine-agnostic description of tables, columns, keys,
//! indexes and foreign keys that a circular model is built from.
//!
//! Two sources produce this shape: the live `sys.*` catalog (see [`system`]) and
//! catalog snapshot files (see [`snapshot`]).

pub mod snapshot;
pub mod system;

use std::fmt;

use crate::names::ObjectName;

/// Sort direction of a key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexDirection {
    #[default]
    Unknown,
    Ascending,
    Descending,
}

impl IndexDirection {
    pub fn from_descending_flag(descending: bool) -> Self {
        if descending {
            IndexDirection::Descending
        } else {
            IndexDirection::Ascending
        }
    }

    /// Suffix for an `order by` item.
    pub fn sql_suffix(&self) -> &'static str {
        match self {
            IndexDirection::Descending => " desc",
            IndexDirection::Ascending | IndexDirection::Unknown => "",
        }
    }

    /// Operator that selects rows at or after a seek position in this direction.
    pub fn seek_operator(&self) -> &'static str {
        match self {
            IndexDirection::Descending => "<=",
            IndexDirection::Ascending | IndexDirection::Unknown => ">=",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexDirection::Unknown => "unknown",
            IndexDirection::Ascending => "asc",
            IndexDirection::Descending => "desc",
        }
    }

    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => IndexDirection::Ascending,
            "desc" | "descending" => IndexDirection::Descending,
            _ => IndexDirection::Unknown,
        }
    }
}

/// Why an index can't be used for seeking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedTag {
    Disabled,
    Filtered,
    Hypothetical,
    NotBTree,
    UnsupportedColumn,
    MissingColumn,
}

impl UnsupportedTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnsupportedTag::Disabled => "disabled",
            UnsupportedTag::Filtered => "filtered",
            UnsupportedTag::Hypothetical => "hypothetical",
            UnsupportedTag::NotBTree => "not-btree",
            UnsupportedTag::UnsupportedColumn => "unsupported-column",
            UnsupportedTag::MissingColumn => "missing-column",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        [
            UnsupportedTag::Disabled,
            UnsupportedTag::Filtered,
            UnsupportedTag::Hypothetical,
            UnsupportedTag::NotBTree,
            UnsupportedTag::UnsupportedColumn,
            UnsupportedTag::MissingColumn,
        ]
        .into_iter()
        .find(|tag| tag.as_str() == text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedReason {
    pub tag: UnsupportedTag,
    pub message: String,
}

impl UnsupportedReason {
    pub fn new(tag: UnsupportedTag, message: impl Into<String>) -> Self {
        Self {
            tag,
            message: message.into(),
        }
    }
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag.as_str(), self.message)
    }
}

/// A whole database catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSchema {
    pub tables: Vec<CatalogTable>,
    /// Latest object modification date, used to detect schema changes.
    pub fingerprint: Option<String>,
}

impl CatalogSchema {
    pub fn new(tables: Vec<CatalogTable>) -> Self {
        Self {
            tables,
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn table(&self, name: &ObjectName) -> Option<&CatalogTable> {
        self.tables.iter().find(|t| &t.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogTable {
    pub name: ObjectName,
    pub is_view: bool,
    /// In ordinal order.
    pub columns: Vec<CatalogColumn>,
    pub keyishes: Vec<CatalogKeyish>,
    pub foreign_keys: Vec<CatalogForeignKey>,
}

#[derive(Debug, Clone)]
pub struct CatalogColumn {
    pub name: String,
    pub type_name: String,
    pub is_nullable: bool,
}

/// An index or a constraint backed by one.
#[derive(Debug, Clone)]
pub struct CatalogKeyish {
    pub name: String,
    pub is_unique: bool,
    pub is_primary: bool,
    pub columns: Vec<CatalogKeyColumn>,
    /// Set when the index itself can't be used (disabled, filtered, ...).
    pub unsupported: Option<UnsupportedReason>,
}

#[derive(Debug, Clone)]
pub struct CatalogKeyColumn {
    pub name: String,
    pub direction: IndexDirection,
}

#[derive(Debug, Clone)]
pub struct CatalogForeignKey {
    pub name: String,
    /// Dependent columns, aligned with the referenced key's columns.
    pub columns: Vec<String>,
    pub referenced_table: ObjectName,
    pub referenced_key: String,
}

impl CatalogTable {
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            is_view: false,
            columns: Vec::new(),
            keyishes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn view(mut self) -> Self {
        self.is_view = true;
        self
    }

    pub fn column(mut self, name: &str, type_name: &str, is_nullable: bool) -> Self {
        self.columns.push(CatalogColumn {
            name: name.to_string(),
            type_name: type_name.to_string(),
            is_nullable,
        });
        self
    }

    pub fn primary_key(self, name: &str, columns: &[&str]) -> Self {
        self.keyish(name, true, true, columns)
    }

    pub fn unique_index(self, name: &str, columns: &[&str]) -> Self {
        self.keyish(name, true, false, columns)
    }

    pub fn index(self, name: &str, columns: &[&str]) -> Self {
        self.keyish(name, false, false, columns)
    }

    /// Add a keyish with explicit per-column directions.
    pub fn directed_index(
        mut self,
        name: &str,
        is_unique: bool,
        columns: &[(&str, IndexDirection)],
    ) -> Self {
        self.keyishes.push(CatalogKeyish {
            name: name.to_string(),
            is_unique,
            is_primary: false,
            columns: columns
                .iter()
                .map(|(c, d)| CatalogKeyColumn {
                    name: c.to_string(),
                    direction: *d,
                })
                .collect(),
            unsupported: None,
        });
        self
    }

    /// Mark the most recently added keyish as intrinsically unsupported.
    pub fn unsupported(mut self, reason: UnsupportedReason) -> Self {
        if let Some(last) = self.keyishes.last_mut() {
            last.unsupported = Some(reason);
        }
        self
    }

    pub fn foreign_key(
        mut self,
        name: &str,
        columns: &[&str],
        referenced_table: ObjectName,
        referenced_key: &str,
    ) -> Self {
        self.foreign_keys.push(CatalogForeignKey {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_table,
            referenced_key: referenced_key.to_string(),
        });
        self
    }

    fn keyish(mut self, name: &str, is_unique: bool, is_primary: bool, columns: &[&str]) -> Self {
        self.keyishes.push(CatalogKeyish {
            name: name.to_string(),
            is_unique,
            is_primary,
            columns: columns
                .iter()
                .map(|c| CatalogKeyColumn {
                    name: c.to_string(),
                    direction: IndexDirection::Ascending,
                })
                .collect(),
            unsupported: None,
        });
        self
    }
}

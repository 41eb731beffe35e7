//! Column type registry
//!
//! Maps catalog type names (`nvarchar`, `int`, `datetime2`, ...) to a [`ColumnType`]
//! strategy that knows how to validate user-entered search text and how to take part
//! in a free-text scan. Validation is prefix-style: incomplete input expands to the
//! inclusive range of values it could denote (`"2001"` on a date column is
//! `2001-01-01 ..= 2001-12-31`), complete input collapses to a single value.

mod binary;
mod character;
mod datetime;
mod guid;
mod numeric;

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use thiserror::Error;

pub use datetime::DateTimeKind;
pub use numeric::IntegerKind;

/// A user-supplied value that could not be interpreted for a column type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Inclusive bounds, as SQL-ready literal text. `None` means unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValueRange {
    pub lower: Option<String>,
    pub upper: Option<String>,
}

impl ValueRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn exact(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            lower: Some(value.clone()),
            upper: Some(value),
        }
    }

    pub fn between(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }

    /// True when the input identified exactly one value.
    pub fn is_exact(&self) -> bool {
        self.lower.is_some() && self.lower == self.upper
    }
}

/// Result of validating one value against one column.
pub type Validation = Result<ValueRange, ValidationError>;

/// How a column takes part in a free-text scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOption {
    /// Column must equal the (normalized) value.
    Equal(String),
    /// Column must contain the value.
    Substring(String),
}

/// Validation and formatting strategy for one SQL Server type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Character { unicode: bool },
    Integer(IntegerKind),
    Decimal,
    Float,
    Guid,
    DateTime(DateTimeKind),
    Binary,
    /// CLR-backed types (`hierarchyid`, `geometry`, `geography`).
    Assembly,
}

impl ColumnType {
    /// Look up a catalog type name. Unknown or unsupported wire types yield `None`.
    pub fn from_sql_name(type_name: &str) -> Option<ColumnType> {
        REGISTRY
            .get(type_name.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn validate(&self, text: &str) -> Validation {
        match self {
            ColumnType::Character { .. } => character::validate(text),
            ColumnType::Integer(kind) => numeric::validate_integer(*kind, text),
            ColumnType::Decimal => numeric::validate_decimal(text),
            ColumnType::Float => numeric::validate_float(text),
            ColumnType::Guid => guid::validate(text),
            ColumnType::DateTime(kind) => datetime::validate(*kind, text),
            ColumnType::Binary | ColumnType::Assembly => binary::validate(text),
        }
    }

    /// The scan predicate this column contributes for `value`, if any.
    pub fn scan_option(&self, value: &str) -> Option<ScanOption> {
        match self {
            ColumnType::Character { .. } => character::scan_option(value),
            ColumnType::Integer(_) | ColumnType::Decimal | ColumnType::Float | ColumnType::Guid => {
                match self.validate(value) {
                    Ok(range) if range.is_exact() => range.lower.map(ScanOption::Equal),
                    _ => None,
                }
            }
            ColumnType::DateTime(_) | ColumnType::Binary | ColumnType::Assembly => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ColumnType::Character { .. })
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ColumnType::Binary)
    }

    /// Values must be selected through `ToString()` to be representable in XML.
    pub fn needs_text_cast(&self) -> bool {
        matches!(self, ColumnType::Assembly)
    }

    /// Whether an index over this column can be used for seeking.
    pub fn is_seekable(&self) -> bool {
        !matches!(self, ColumnType::Binary | ColumnType::Assembly)
    }
}

static REGISTRY: LazyLock<HashMap<&'static str, ColumnType>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for name in ["char", "varchar", "sysname"] {
        map.insert(name, ColumnType::Character { unicode: name == "sysname" });
    }
    for name in ["nchar", "nvarchar"] {
        map.insert(name, ColumnType::Character { unicode: true });
    }
    map.insert("bit", ColumnType::Integer(IntegerKind::Bit));
    map.insert("tinyint", ColumnType::Integer(IntegerKind::TinyInt));
    map.insert("smallint", ColumnType::Integer(IntegerKind::SmallInt));
    map.insert("int", ColumnType::Integer(IntegerKind::Int));
    map.insert("bigint", ColumnType::Integer(IntegerKind::BigInt));
    for name in ["decimal", "numeric", "money", "smallmoney"] {
        map.insert(name, ColumnType::Decimal);
    }
    for name in ["float", "real"] {
        map.insert(name, ColumnType::Float);
    }
    map.insert("uniqueidentifier", ColumnType::Guid);
    map.insert("date", ColumnType::DateTime(DateTimeKind::Date));
    map.insert("time", ColumnType::DateTime(DateTimeKind::Time));
    map.insert("smalldatetime", ColumnType::DateTime(DateTimeKind::SmallDateTime));
    map.insert("datetime", ColumnType::DateTime(DateTimeKind::DateTime));
    map.insert("datetime2", ColumnType::DateTime(DateTimeKind::DateTime2));
    map.insert("datetimeoffset", ColumnType::DateTime(DateTimeKind::DateTimeOffset));
    for name in ["binary", "varbinary", "timestamp", "rowversion"] {
        map.insert(name, ColumnType::Binary);
    }
    for name in ["hierarchyid", "geometry", "geography"] {
        map.insert(name, ColumnType::Assembly);
    }
    map
});

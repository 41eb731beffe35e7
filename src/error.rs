//! Error types for rust-sqlbrowse

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while modeling a schema or compiling/materializing extents.
///
/// Everything here except the snapshot I/O variants signals a caller bug or a catalog
/// the model cannot represent. None of them are meant to be retried.
#[derive(Error, Debug)]
pub enum BrowseError {
    #[error("Invalid object name part '{part}': {reason}")]
    InvalidNamePart { part: String, reason: &'static str },

    #[error("Invalid escaped object name: {text}")]
    InvalidEscapedName { text: String },

    #[error("The root name is unusable in SQL")]
    RootNameInSql,

    #[error("Could not resolve table {name}")]
    UnresolvedTable { name: String },

    #[error("Could not resolve column {column} in table {table}")]
    UnresolvedColumn { table: String, column: String },

    #[error("Could not resolve key {key} in table {table}")]
    UnresolvedKey { table: String, key: String },

    #[error("Can't find relation {relation} in table {table}")]
    UnresolvedRelation { relation: String, table: String },

    #[error("Extent for {relation} has {values} filter values but only {order} order columns")]
    TooManyValues {
        relation: String,
        values: usize,
        order: usize,
    },

    #[error("Unknown flavor: {name}")]
    UnknownFlavor { name: String },

    #[error("Invalid catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("Unexpected query result shape: {message}")]
    UnexpectedResult { message: String },

    #[error("Failed to parse XML")]
    XmlParseError {
        #[source]
        source: roxmltree::Error,
    },

    #[error("XML generation error: {message}")]
    XmlGenerationError { message: String },

    #[error("Failed to read catalog snapshot: {path}")]
    SnapshotReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write catalog snapshot: {path}")]
    SnapshotWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<roxmltree::Error> for BrowseError {
    fn from(err: roxmltree::Error) -> Self {
        BrowseError::XmlParseError { source: err }
    }
}

/// Wrap any XML writer failure (quick-xml error or the underlying I/O error).
pub(crate) fn xml_generation_error<E: std::fmt::Display>(err: E) -> BrowseError {
    BrowseError::XmlGenerationError {
        message: err.to_string(),
    }
}

pub type Result<T, E = BrowseError> = std::result::Result<T, E>;

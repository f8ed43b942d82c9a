//! Data-model error types.
//!
//! These errors are raised while building datasets or binding specs to a
//! schema. Analysis errors (`EngineError`), loader errors (`SourceError`) and
//! sink errors (`SinkError`) live in their respective crates and wrap this one.

use thiserror::Error;

use crate::value::ColumnType;

/// Errors raised by the core data model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced column is not part of the dataset schema.
    #[error("Unknown column '{column}' in dataset '{dataset}'")]
    UnknownColumn { dataset: String, column: String },

    /// A cell value does not match its declared column type.
    #[error("Type mismatch in column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: String,
    },

    /// Two rows share the same row key.
    #[error("Duplicate row key {key} in dataset '{dataset}'")]
    DuplicateRowKey { dataset: String, key: String },

    /// A row has a null or missing row key.
    #[error("Row {row} of dataset '{dataset}' has no value for row key '{column}'")]
    MissingRowKey {
        dataset: String,
        column: String,
        row: usize,
    },

    /// A row has the wrong number of cells for the schema.
    #[error("Row {row} of dataset '{dataset}' has {found} cells, schema declares {expected}")]
    RowWidth {
        dataset: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A quasi-identifier or query spec is malformed.
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),
}

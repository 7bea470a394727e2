//! Error types for gridtype-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type CoreResult<T> = std::result::Result<T, Error>;

/// Errors that can occur in gridtype-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid unit name
    #[error("Invalid unit name: {0}")]
    InvalidUnit(String),

    /// Unit root that cannot be taken
    #[error("Unit {unit} has no exact root of order {root}")]
    NoExactRoot { unit: String, root: i64 },

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Duplicate table identifier
    #[error("Table already exists: {0}")]
    DuplicateTable(String),

    /// Column not found in a table
    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    /// Duplicate column name in a table
    #[error("Column already exists: {table}.{column}")]
    DuplicateColumn { table: String, column: String },

    /// Column length disagrees with the table's row count
    #[error("Column {column} has {actual} rows, table {table} has {expected}")]
    RowCountMismatch {
        table: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid value type for operation
    #[error("Invalid value type: expected {expected}, got {actual}")]
    InvalidValueType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid temporal literal
    #[error("Invalid {kind} literal: {text}")]
    InvalidTemporal { kind: &'static str, text: String },
}

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by either table backend.
///
/// Validation variants are raised before any row is touched. The backend
/// variants carry the engine's own error unchanged.
#[derive(Debug, Error, Diagnostic)]
pub enum DatabaseError {
    /// The record is missing, has unknown columns, or lacks a key value.
    #[error("Invalid record: {0}")]
    #[diagnostic(code(tabletemplate::invalid_record))]
    InvalidRecord(String),

    /// An identical record is already stored.
    #[error("Duplicate record: {0}")]
    #[diagnostic(
        code(tabletemplate::duplicate_record),
        help("use DuplicatePolicy::Warn to skip duplicates instead of failing")
    )]
    DuplicateRecord(String),

    #[error("Column not found: {0}")]
    #[diagnostic(code(tabletemplate::column_not_found))]
    ColumnNotFound(String),

    /// A name that cannot be rendered into SQL text, even quoted.
    #[error("Invalid identifier: {0:?}")]
    #[diagnostic(
        code(tabletemplate::invalid_identifier),
        help("names must be non-empty, and table names may be qualified once as schema.table")
    )]
    InvalidIdentifier(String),

    #[error("Invalid query: {0}")]
    #[diagnostic(code(tabletemplate::invalid_query))]
    InvalidQuery(String),

    #[error("Type mismatch: {0}")]
    #[diagnostic(code(tabletemplate::type_mismatch))]
    TypeMismatch(String),

    #[error(transparent)]
    #[diagnostic(code(tabletemplate::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(tabletemplate::csv))]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    #[diagnostic(code(tabletemplate::sqlite))]
    Sqlite(#[from] rusqlite::Error),
}

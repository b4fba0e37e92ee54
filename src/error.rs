use thiserror::Error;

/// Fatal conditions raised by the merge core.
///
/// Anything that can degrade gracefully (a malformed annotation bundle, an
/// empty table reaching the quality filter) is reported through diagnostics
/// and log lines instead.
#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("row {row} has {found} fields but the header has {expected}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{0}' appears more than once in the schema")]
    DuplicateColumn(String),

    #[error("column '{0}' is not present in the table")]
    UnknownColumn(String),

    #[error("row {row} is out of range for a table of {len} rows")]
    RowOutOfRange { row: usize, len: usize },

    #[error("barcode '{0}' has no entry in the barcode table")]
    ProvenanceNotFound(String),

    #[error("transcript '{0}' is not in the canonical transcript list")]
    ConsistencyViolation(String),
}

pub type MergeResult<T> = Result<T, MergeError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

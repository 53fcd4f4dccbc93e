use chrono::NaiveDate;
use thiserror::Error;

/// Error type definitions
#[derive(Error, Debug)]
pub enum Error {
    #[error("table has no rows")]
    EmptyTable,

    #[error("duplicate date at row {row}: {date}")]
    DuplicateDate { row: usize, date: NaiveDate },

    #[error("row count mismatch for column '{name}': expected {expected}, found {found}")]
    InconsistentRowCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("computation failed: {0}")]
    Computation(String),
}

/// Type alias for Result
pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors raised while retrieving a raw feed from object storage.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("object store is not configured: {0}")]
    MissingConfig(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store responded with status {status} for '{key}'")]
    Status { status: u16, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("input has no header row")]
    EmptyInput,

    #[error("header defect at column {index}: {reason}")]
    HeaderDefect { index: usize, reason: String },

    #[error("row on line {line} has {found} fields, header has {expected}")]
    ReadMisalignment {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("realignment precondition failed: {0}")]
    RealignmentPrecondition(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("column '{column}' has {found} values, table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("dataframe operation failed: {0}")]
    Frame(#[from] polars::error::PolarsError),

    #[error("unknown feed: {0}")]
    UnknownFeed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PrepError>;

//! Error types for DBF table I/O

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbfError>;

#[derive(Error, Debug)]
pub enum DbfError {
    #[error("Cannot open {}: {source}", .path.display())]
    IoUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File is too small to contain {structure}, need = {required}, file_size = {actual}")]
    TruncatedInput {
        structure: &'static str,
        required: u64,
        actual: u64,
    },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Field name too long, max length is 10, got {len}: {name}")]
    FieldNameTooLong { name: String, len: usize },

    #[error("Value of field [{field}] is too long! Limit = {limit}, Actual = {actual}")]
    ValueTooLong {
        field: String,
        limit: usize,
        actual: usize,
    },

    #[error("Field [{name}] is too wide: width {width} does not fit a one-byte length")]
    FieldTooWide { name: String, width: usize },

    #[error("Layout overflow: {0}")]
    LayoutOverflow(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbfError {
    /// Stable error code for user-facing output.
    pub fn code(&self) -> &'static str {
        match self {
            DbfError::IoUnavailable { .. } => "IO_UNAVAILABLE",
            DbfError::Io(_) => "IO_ERROR",
            DbfError::TruncatedInput { .. } => "TRUNCATED_INPUT",
            DbfError::InvalidRange(_) => "INVALID_RANGE",
            DbfError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            DbfError::FieldNameTooLong { .. } => "FIELD_NAME_TOO_LONG",
            DbfError::ValueTooLong { .. } => "VALUE_TOO_LONG",
            DbfError::FieldTooWide { .. } => "FIELD_TOO_WIDE",
            DbfError::LayoutOverflow(_) => "LAYOUT_OVERFLOW",
            DbfError::Json(_) => "INVALID_SCHEMA_FILE",
        }
    }
}

//! Error types for hw-core

use thiserror::Error;

/// Core error type for the warehouse loader
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: IO error with file path context
    #[error("[C003] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C004: YAML parse error
    #[error("[C004] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// C005: Row does not match the batch's column count
    #[error("[C005] Row has {found} values but batch has {expected} columns")]
    RowArity { expected: usize, found: usize },

    /// C006: Column referenced by name is not part of the batch
    #[error("[C006] Column '{column}' not found in batch")]
    ColumnNotFound { column: String },

    /// C007: A calendar key could not be derived from the given values
    #[error("[C007] Invalid calendar key in row {row}: {reason}")]
    InvalidCalendarKey { row: usize, reason: String },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

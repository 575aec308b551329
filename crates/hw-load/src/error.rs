//! Error types for hw-load

use hw_core::CoreError;
use hw_db::DbError;
use thiserror::Error;

/// Errors raised while resolving keys or merging a batch.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Destination or dimension table is absent (L001)
    #[error("[L001] Table not found: {table}. Create it before loading")]
    MissingTable { table: String },

    /// Natural keys not present in a dimension that rejects unmatched rows (L002)
    #[error("[L002] {count} unresolved key(s) for {dimension}: {sample}")]
    UnresolvedDimensionKey {
        dimension: String,
        count: usize,
        sample: String,
    },

    /// Two dimension rows share one natural key after case folding (L003)
    #[error("[L003] Natural key '{key}' maps to ids {first} and {second} in {table}")]
    AmbiguousDimensionKey {
        table: String,
        key: String,
        first: i64,
        second: i64,
    },

    /// Batch lacks columns the destination requires (L004)
    #[error("[L004] Batch for {table} is missing required column(s): {}", .missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    /// A key column value cannot be cast to an integer (L005)
    #[error("[L005] Key column '{column}' in row {row} is not an integer: {value}")]
    InvalidForeignKey {
        column: String,
        row: usize,
        value: String,
    },

    /// Best-effort staging cleanup failed; the table may have leaked (L006)
    #[error("[L006] Failed to drop staging table {table}: {source}")]
    StagingCleanupFailure {
        table: String,
        #[source]
        source: DbError,
    },

    /// No free staging table name after the configured attempts (L007)
    #[error("[L007] No free staging table name for {table} after {attempts} attempt(s)")]
    StagingNameExhausted { table: String, attempts: u32 },

    /// Error from the core layer (L008)
    #[error("[L008] {0}")]
    Core(#[from] CoreError),

    /// Error from the database layer (L009)
    #[error("[L009] {0}")]
    Db(#[from] DbError),
}

/// Result type alias for [`LoadError`].
pub type LoadResult<T> = Result<T, LoadError>;

//! Scoped staging tables.
//!
//! A [`StagingTable`] is created for exactly one upsert call and dropped when
//! the guard goes out of scope, whether the merge committed, failed, or the
//! surrounding transaction was rolled back.

use crate::error::{LoadError, LoadResult};
use hw_core::{TableName, Value};
use hw_db::Database;
use std::cell::Cell;
use std::fmt;
use uuid::Uuid;

/// Progress of one upsert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpsertPhase {
    /// Nothing created yet.
    Pending,
    /// Staging table exists and holds the batch.
    Staged,
    /// Merge statement executed.
    Merged,
    /// Staging table dropped.
    Cleaned,
}

impl fmt::Display for UpsertPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpsertPhase::Pending => "pending",
            UpsertPhase::Staged => "staged",
            UpsertPhase::Merged => "merged",
            UpsertPhase::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// Fresh staging table name: `prefix` followed by a random 32-hex suffix.
pub fn staging_name(prefix: &str) -> TableName {
    TableName::new(format!("{prefix}{}", Uuid::new_v4().simple()))
}

/// Drop guard around a session-local staging table.
///
/// The guard only owns the table once [`create`](Self::create) succeeded;
/// a failed creation never drops a table of the same name.
pub struct StagingTable<'a> {
    db: &'a dyn Database,
    name: TableName,
    phase: Cell<UpsertPhase>,
    armed: Cell<bool>,
}

impl<'a> StagingTable<'a> {
    pub fn new(db: &'a dyn Database, name: TableName) -> Self {
        Self {
            db,
            name,
            phase: Cell::new(UpsertPhase::Pending),
            armed: Cell::new(false),
        }
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn phase(&self) -> UpsertPhase {
        self.phase.get()
    }

    /// Create the table with the types `columns` have in `like`.
    pub fn create(&self, like: &TableName, columns: &[String]) -> LoadResult<()> {
        let sql = self.db.create_staging_sql(&self.name, like, columns);
        self.db.execute(&sql)?;
        self.armed.set(true);
        self.advance(UpsertPhase::Staged);
        Ok(())
    }

    /// Bulk-load rows into the staging table.
    pub fn load(&self, columns: &[String], rows: &[Vec<Value>]) -> LoadResult<usize> {
        let loaded = self.db.insert_rows(&self.name, columns, rows)?;
        log::debug!("Loaded {loaded} row(s) into staging table {}", self.name);
        Ok(loaded)
    }

    /// Record a phase transition.
    pub fn advance(&self, phase: UpsertPhase) {
        log::debug!("Staging table {}: {} -> {phase}", self.name, self.phase.get());
        self.phase.set(phase);
    }

    /// Drop the table now.
    ///
    /// The guard is disarmed either way; a failure is returned as
    /// [`LoadError::StagingCleanupFailure`] for the caller to report.
    pub fn cleanup(&self) -> LoadResult<()> {
        if !self.armed.replace(false) {
            return Ok(());
        }
        self.db
            .drop_if_exists(&self.name)
            .map_err(|source| LoadError::StagingCleanupFailure {
                table: self.name.to_string(),
                source,
            })?;
        self.advance(UpsertPhase::Cleaned);
        Ok(())
    }
}

impl Drop for StagingTable<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.cleanup() {
            log::warn!("{err}");
        }
    }
}

//! Idempotent set-based merge of a batch into a fact table.

use crate::error::{LoadError, LoadResult};
use crate::reconcile::{Reconciled, SchemaReconciler, CREATED_ON, UNIQUE_KEY};
use crate::staging::{staging_name, StagingTable, UpsertPhase};
use chrono::NaiveDateTime;
use hw_core::{Batch, Config, TableName};
use hw_db::{with_transaction, Database, DbError};
use std::collections::HashMap;

/// What one upsert call did.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertReport {
    /// Schema-qualified destination.
    pub destination: TableName,
    /// Staging table used, if the batch was not empty.
    pub staging_table: Option<TableName>,
    /// Rows handed in.
    pub rows_in: usize,
    /// Rows inserted or updated, as reported by the backend.
    pub rows_merged: usize,
    /// Rows discarded because a later row carried the same unique key.
    pub duplicates_collapsed: usize,
    /// Last phase reached.
    pub phase: UpsertPhase,
    /// Whether the staging table could not be dropped.
    pub leaked_staging: bool,
}

/// Merges batches into fact tables keyed by `unique_key`.
///
/// Replaying a batch yields the same destination state: existing rows are
/// updated in place, `created_on` keeps its first value.
pub struct UpsertEngine<'a> {
    db: &'a dyn Database,
    config: &'a Config,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(db: &'a dyn Database, config: &'a Config) -> Self {
        Self { db, config }
    }

    /// Merge `batch` into `destination`, stamping rows with the current time.
    pub fn upsert(&self, batch: Batch, destination: &TableName) -> LoadResult<UpsertReport> {
        self.upsert_at(batch, destination, chrono::Utc::now().naive_utc())
    }

    /// Merge `batch` into `destination` with `now` as the write time.
    ///
    /// Either the whole batch is merged or the destination is left as it
    /// was.
    pub fn upsert_at(
        &self,
        batch: Batch,
        destination: &TableName,
        now: NaiveDateTime,
    ) -> LoadResult<UpsertReport> {
        let destination = destination.qualify(self.config.schema.as_deref());
        let reconciler = SchemaReconciler::new(self.db, self.config);
        let columns = reconciler.destination_columns(&destination)?;

        let rows_in = batch.len();
        let Reconciled { batch, key_columns } =
            reconciler.reconcile_with(batch, &destination, &columns, now)?;
        let (batch, duplicates_collapsed) = collapse_duplicates(batch)?;
        if duplicates_collapsed > 0 {
            log::warn!(
                "Collapsed {duplicates_collapsed} row(s) with repeated unique keys for {destination}; last occurrence wins"
            );
        }

        let mut report = UpsertReport {
            destination: destination.clone(),
            staging_table: None,
            rows_in,
            rows_merged: 0,
            duplicates_collapsed,
            phase: UpsertPhase::Pending,
            leaked_staging: false,
        };
        if batch.is_empty() {
            log::debug!("Nothing to merge into {destination}");
            return Ok(report);
        }

        let (column_names, rows) = batch.into_parts();
        let update_columns: Vec<String> = column_names
            .iter()
            .filter(|c| {
                !key_columns.contains(c) && c.as_str() != UNIQUE_KEY && c.as_str() != CREATED_ON
            })
            .cloned()
            .collect();

        let attempts = self.config.staging.max_attempts;
        for attempt in 1..=attempts {
            let name = staging_name(&self.config.staging.prefix);
            if self.db.relation_exists(&name)? {
                log::warn!("Staging table name {name} is taken (attempt {attempt}/{attempts})");
                continue;
            }

            let staging = StagingTable::new(self.db, name);
            let merged = with_transaction(self.db, || -> LoadResult<usize> {
                staging.create(&destination, &column_names)?;
                staging.load(&column_names, &rows)?;
                let sql = self.db.upsert_sql(
                    &destination,
                    staging.name(),
                    &column_names,
                    UNIQUE_KEY,
                    &update_columns,
                );
                let merged = self.db.execute(&sql)?;
                staging.advance(UpsertPhase::Merged);
                Ok(merged)
            });

            let merged = match merged {
                Ok(merged) => merged,
                Err(LoadError::Db(DbError::AlreadyExists(_)))
                    if staging.phase() == UpsertPhase::Pending =>
                {
                    log::warn!(
                        "Staging table {} appeared concurrently (attempt {attempt}/{attempts})",
                        staging.name()
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Err(err) = staging.cleanup() {
                log::warn!("{err}");
                report.leaked_staging = true;
            }
            log::debug!("Merged {merged} row(s) into {destination} via {}", staging.name());

            report.rows_merged = merged;
            report.phase = staging.phase();
            report.staging_table = Some(staging.name().clone());
            return Ok(report);
        }

        Err(LoadError::StagingNameExhausted {
            table: destination.to_string(),
            attempts,
        })
    }
}

/// Keep only the last row for each unique key, preserving row order.
fn collapse_duplicates(mut batch: Batch) -> LoadResult<(Batch, usize)> {
    let idx = batch.require_column(UNIQUE_KEY)?;
    let mut last: HashMap<String, usize> = HashMap::with_capacity(batch.len());
    for (row_no, row) in batch.rows().iter().enumerate() {
        last.insert(row[idx].to_string(), row_no);
    }

    let before = batch.len();
    batch.retain_rows(|row_no, row| last.get(&row[idx].to_string()) == Some(&row_no));
    let collapsed = before - batch.len();
    Ok((batch, collapsed))
}

#[cfg(test)]
#[path = "upsert_test.rs"]
mod tests;

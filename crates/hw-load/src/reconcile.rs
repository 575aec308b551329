//! Alignment of a resolved batch with its destination table.
//!
//! The reconciler never invents data: a destination column the batch does
//! not provide is an error, not a null or a placeholder. The only values it
//! adds are the engine-managed `unique_key`, `created_on` and `updated_on`.

use crate::error::{LoadError, LoadResult};
use chrono::NaiveDateTime;
use hw_core::{Batch, Config, TableName, Value, SURROGATE_KEY};
use hw_db::{ColumnInfo, Database};
use std::collections::HashSet;

/// Conflict target column carried by every fact table.
pub const UNIQUE_KEY: &str = "unique_key";
/// Set on first insert, never updated.
pub const CREATED_ON: &str = "created_on";
/// Refreshed on every write.
pub const UPDATED_ON: &str = "updated_on";

const FK_SUFFIX: &str = "_fk";

/// A batch ready for staging.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Destination columns (without the surrogate id) in declaration order.
    pub batch: Batch,
    /// Columns whose integer values form the unique key, in key order.
    pub key_columns: Vec<String>,
}

pub struct SchemaReconciler<'a> {
    db: &'a dyn Database,
    config: &'a Config,
}

impl<'a> SchemaReconciler<'a> {
    pub fn new(db: &'a dyn Database, config: &'a Config) -> Self {
        Self { db, config }
    }

    /// Destination columns without the surrogate id, names lower-cased.
    pub fn destination_columns(&self, destination: &TableName) -> LoadResult<Vec<ColumnInfo>> {
        if !self.db.relation_exists(destination)? {
            return Err(LoadError::MissingTable {
                table: destination.to_string(),
            });
        }
        let columns = self
            .db
            .table_columns(destination)?
            .into_iter()
            .filter(|c| !c.name.eq_ignore_ascii_case(SURROGATE_KEY))
            .map(lowercase_name)
            .collect();
        Ok(columns)
    }

    /// Reconcile `batch` against the current schema of `destination`,
    /// stamping rows with the current UTC time.
    pub fn reconcile(&self, batch: Batch, destination: &TableName) -> LoadResult<Reconciled> {
        let columns = self.destination_columns(destination)?;
        let now = chrono::Utc::now().naive_utc();
        self.reconcile_with(batch, destination, &columns, now)
    }

    /// Columns forming the unique key of `destination`.
    ///
    /// A configured override wins; otherwise every `*_fk` column in
    /// declaration order.
    pub fn key_columns(
        &self,
        destination: &TableName,
        columns: &[ColumnInfo],
    ) -> LoadResult<Vec<String>> {
        let key_columns: Vec<String> = match self.config.unique_key_columns(destination) {
            Some(configured) => configured.iter().map(|c| c.to_lowercase()).collect(),
            None => columns
                .iter()
                .filter(|c| c.name.ends_with(FK_SUFFIX))
                .map(|c| c.name.clone())
                .collect(),
        };

        let declared: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let mut missing: Vec<String> = key_columns
            .iter()
            .filter(|c| !declared.contains(c.as_str()))
            .cloned()
            .collect();
        if !declared.contains(UNIQUE_KEY) {
            missing.push(UNIQUE_KEY.to_string());
        }
        if key_columns.is_empty() {
            missing.push(format!("*{FK_SUFFIX}"));
        }
        if !missing.is_empty() {
            return Err(LoadError::SchemaMismatch {
                table: destination.to_string(),
                missing,
            });
        }
        Ok(key_columns)
    }

    /// Reconcile `batch` against already-fetched destination `columns`.
    ///
    /// Column names match case-insensitively on both sides.
    pub fn reconcile_with(
        &self,
        mut batch: Batch,
        destination: &TableName,
        columns: &[ColumnInfo],
        now: NaiveDateTime,
    ) -> LoadResult<Reconciled> {
        let columns: Vec<ColumnInfo> = columns.iter().cloned().map(lowercase_name).collect();
        let columns = columns.as_slice();
        let key_columns = self.key_columns(destination, columns)?;
        batch.lowercase_columns();

        let managed = [UNIQUE_KEY, CREATED_ON, UPDATED_ON];
        let payload: Vec<&ColumnInfo> = columns
            .iter()
            .filter(|c| !managed.contains(&c.name.as_str()))
            .collect();

        let missing: Vec<String> = payload
            .iter()
            .filter(|c| batch.column_index(&c.name).is_none())
            .map(|c| c.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::SchemaMismatch {
                table: destination.to_string(),
                missing,
            });
        }

        let extra: Vec<&str> = batch
            .columns()
            .iter()
            .filter(|c| !columns.iter().any(|d| &d.name == *c))
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            log::debug!(
                "Dropping column(s) absent from {destination}: {}",
                extra.join(", ")
            );
        }

        let payload_names: Vec<String> = payload.iter().map(|c| c.name.clone()).collect();
        let projected = batch.project(&payload_names)?;
        let (_, mut rows) = projected.into_parts();

        let measure_idx: Vec<usize> = payload
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_numeric() && !key_columns.contains(&c.name))
            .map(|(i, _)| i)
            .collect();
        for row in &mut rows {
            for &i in &measure_idx {
                if row[i].is_non_finite() || row[i].is_null() {
                    row[i] = Value::Int(0);
                }
            }
        }

        let key_idx: Vec<usize> = key_columns
            .iter()
            .map(|k| payload_names.iter().position(|c| c == k))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| LoadError::SchemaMismatch {
                table: destination.to_string(),
                missing: key_columns.clone(),
            })?;

        let out_columns: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let mut out = Batch::new(out_columns.iter().cloned());
        for (row_no, row) in rows.into_iter().enumerate() {
            let unique_key = unique_key(&row, &key_idx, &payload_names, row_no)?;
            let mut payload_values = row.into_iter();
            let values = columns
                .iter()
                .map(|c| match c.name.as_str() {
                    UNIQUE_KEY => Value::Text(unique_key.clone()),
                    CREATED_ON | UPDATED_ON => Value::Timestamp(now),
                    _ => payload_values.next().unwrap_or(Value::Null),
                })
                .collect();
            out.push_row(values)?;
        }

        Ok(Reconciled {
            batch: out,
            key_columns,
        })
    }
}

/// Identifiers are case-insensitive in the warehouse.
fn lowercase_name(column: ColumnInfo) -> ColumnInfo {
    ColumnInfo {
        name: column.name.to_lowercase(),
        ..column
    }
}

/// `-`-joined integer values of the key columns.
fn unique_key(
    row: &[Value],
    key_idx: &[usize],
    names: &[String],
    row_no: usize,
) -> LoadResult<String> {
    let parts = key_idx
        .iter()
        .map(|&i| {
            row[i]
                .as_key_int()
                .map(|n| n.to_string())
                .ok_or_else(|| LoadError::InvalidForeignKey {
                    column: names[i].clone(),
                    row: row_no,
                    value: row[i].to_string(),
                })
        })
        .collect::<LoadResult<Vec<_>>>()?;
    Ok(parts.join("-"))
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;

//! Database trait definition

use crate::error::{DbError, DbResult};
use hw_core::sql_utils::{column_list, quote_ident};
use hw_core::{TableName, Value};

/// One column of a table as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Whether the declared type holds numbers.
    pub fn is_numeric(&self) -> bool {
        let ty = self.data_type.to_ascii_uppercase();
        let base = ty.split('(').next().unwrap_or_default().trim();
        matches!(
            base,
            "TINYINT"
                | "SMALLINT"
                | "INTEGER"
                | "INT"
                | "BIGINT"
                | "HUGEINT"
                | "UTINYINT"
                | "USMALLINT"
                | "UINTEGER"
                | "UBIGINT"
                | "FLOAT"
                | "REAL"
                | "DOUBLE"
                | "DOUBLE PRECISION"
                | "DECIMAL"
                | "NUMERIC"
        )
    }
}

/// Relational backend used by the load engine.
///
/// Besides executing statements, implementations are the dialect strategy:
/// the staging and merge statements have standard-SQL defaults that a
/// backend overrides when its dialect differs. The engine borrows the
/// backend; connection lifecycle stays with the caller.
pub trait Database {
    /// Execute SQL that modifies data, returns affected rows
    fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists
    fn relation_exists(&self, name: &TableName) -> DbResult<bool>;

    /// Column names and types in declaration order.
    /// Fails with `TableNotFound` when the table has no columns.
    fn table_columns(&self, name: &TableName) -> DbResult<Vec<ColumnInfo>>;

    /// Every `(natural key, surrogate id)` pair of a dimension table, with
    /// the key rendered as text.
    fn lookup_keys(
        &self,
        table: &TableName,
        key_column: &str,
        id_column: &str,
    ) -> DbResult<Vec<(Option<String>, i64)>>;

    /// Bulk-load rows into `table`, returns inserted rows
    fn insert_rows(&self, table: &TableName, columns: &[String], rows: &[Vec<Value>])
        -> DbResult<usize>;

    /// Execute query returning row count
    fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Drop a table if it exists
    fn drop_if_exists(&self, name: &TableName) -> DbResult<()>;

    fn begin(&self) -> DbResult<()>;

    fn commit(&self) -> DbResult<()>;

    fn rollback(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Statement creating an empty session-local staging table with the
    /// types of `columns` in `like`.
    fn create_staging_sql(&self, staging: &TableName, like: &TableName, columns: &[String]) -> String {
        format!(
            "CREATE TEMPORARY TABLE {} AS SELECT {} FROM {} LIMIT 0",
            staging.quoted(),
            column_list(columns),
            like.quoted()
        )
    }

    /// Set-based merge of `staging` into `target` on `conflict_column`.
    ///
    /// Only `update_columns` are overwritten on conflict; with none to
    /// update, conflicting rows are left alone.
    fn upsert_sql(
        &self,
        target: &TableName,
        staging: &TableName,
        columns: &[String],
        conflict_column: &str,
        update_columns: &[String],
    ) -> String {
        let cols = column_list(columns);
        let action = if update_columns.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments = update_columns
                .iter()
                .map(|c| {
                    let col = quote_ident(c);
                    format!("{col} = EXCLUDED.{col}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET {assignments}")
        };
        format!(
            "INSERT INTO {} ({cols}) SELECT {cols} FROM {} ON CONFLICT ({}) {action}",
            target.quoted(),
            staging.quoted(),
            quote_ident(conflict_column),
        )
    }
}

/// Run `body` between `BEGIN` and `COMMIT`, rolling back when it fails.
///
/// A failed rollback is logged; the body's error is what propagates.
pub fn with_transaction<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<DbError>,
{
    db.begin()?;

    match body() {
        Ok(value) => {
            if let Err(commit_err) = db.commit() {
                if let Err(rollback_err) = db.rollback() {
                    log::warn!("ROLLBACK after failed COMMIT also failed: {rollback_err}");
                }
                return Err(DbError::TransactionError(format!("COMMIT failed: {commit_err}")).into());
            }
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = db.rollback() {
                log::warn!("ROLLBACK failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_types() {
        assert!(ColumnInfo::new("cases", "DOUBLE").is_numeric());
        assert!(ColumnInfo::new("deaths", "integer").is_numeric());
        assert!(ColumnInfo::new("rate", "DECIMAL(18,3)").is_numeric());
        assert!(!ColumnInfo::new("label", "VARCHAR").is_numeric());
        assert!(!ColumnInfo::new("created_on", "TIMESTAMP").is_numeric());
        assert!(!ColumnInfo::new("date", "DATE").is_numeric());
    }
}

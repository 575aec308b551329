//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{ColumnInfo, Database};
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use hw_core::sql_utils::{column_list, quote_ident};
use hw_core::{DatabaseConfig, DbType, TableName, Value};
use std::path::Path;

/// DuckDB database backend
///
/// Owns a single connection. The loader is sequential, so there is no
/// `Mutex`; temporary staging tables are visible only to this connection.
pub struct DuckDbBackend {
    conn: Connection,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Open the database described by the `database` config section
    pub fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config.db_type {
            DbType::DuckDb => Self::new(&config.path),
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn execution_error(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {sql}")),
        other => other,
    }
}

/// Bind form of a batch value.
///
/// Dates and timestamps go in as ISO text and are cast by the column type
/// of the receiving table.
fn to_duck_value(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int(n) => DuckValue::BigInt(*n),
        Value::Float(f) => DuckValue::Double(*f),
        Value::Text(s) => DuckValue::Text(s.clone()),
        Value::Date(d) => DuckValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(ts) => DuckValue::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    }
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| execution_error(e, sql))
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql).map_err(DbError::from)
    }

    fn relation_exists(&self, name: &TableName) -> DbResult<bool> {
        let (schema, table) = name.parts();
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count > 0)
    }

    fn table_columns(&self, name: &TableName) -> DbResult<Vec<ColumnInfo>> {
        let (schema, table) = name.parts();
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns
             WHERE table_schema = ? AND table_name = ?
             ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map(duckdb::params![schema, table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        Ok(columns)
    }

    fn lookup_keys(
        &self,
        table: &TableName,
        key_column: &str,
        id_column: &str,
    ) -> DbResult<Vec<(Option<String>, i64)>> {
        let sql = format!(
            "SELECT CAST({} AS VARCHAR), CAST({} AS BIGINT) FROM {}",
            quote_ident(key_column),
            quote_ident(id_column),
            table.quoted()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(|e| execution_error(e, &sql))?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    fn insert_rows(
        &self,
        table: &TableName,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> DbResult<usize> {
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.quoted(),
            column_list(columns)
        );
        let mut stmt = self.conn.prepare(&sql).map_err(|e| execution_error(e, &sql))?;

        let mut inserted = 0;
        for row in rows {
            inserted += stmt
                .execute(duckdb::params_from_iter(row.iter().map(to_duck_value)))
                .map_err(|e| execution_error(e, &sql))?;
        }
        Ok(inserted)
    }

    fn query_count(&self, sql: &str) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM ({sql})"), [], |row| row.get(0))
            .map_err(|e| execution_error(e, sql))?;
        Ok(count as usize)
    }

    fn drop_if_exists(&self, name: &TableName) -> DbResult<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", name.quoted()))?;
        Ok(())
    }

    fn begin(&self) -> DbResult<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&self) -> DbResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&self) -> DbResult<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;

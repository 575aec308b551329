//! hw-db - Database abstraction layer for the health warehouse loader
//!
//! This crate provides the `Database` trait, which doubles as the SQL
//! dialect strategy for the load engine, and its DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{with_transaction, ColumnInfo, Database};

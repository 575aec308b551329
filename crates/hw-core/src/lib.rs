//! hw-core - Core library for the health warehouse loader
//!
//! Shared types used by the database layer and the load engine: in-memory
//! batches, natural-key normalization, the dimension registry, table names,
//! SQL quoting, and YAML configuration.

pub mod batch;
pub mod config;
pub mod dimension;
pub mod error;
pub mod keys;
pub mod sql_utils;
pub mod table_name;

pub use batch::{Batch, Value};
pub use config::{CollapseRule, Config, DatabaseConfig, DbType, StagingConfig};
pub use dimension::{
    AgeInterval, CountryCode, DimensionKind, DimensionSpec, MatchPolicy, SubdivisionCode,
    SubdivisionLevel, UnmatchedPolicy, SURROGATE_KEY,
};
pub use error::{CoreError, CoreResult};
pub use keys::{CodeStandard, CollapseMap};
pub use table_name::TableName;

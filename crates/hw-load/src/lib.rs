//! hw-load - Dimension key resolution and fact upserts
//!
//! A transformed batch goes through [`DimensionResolver::resolve`] once per
//! dimension it references, then into [`UpsertEngine::upsert`], which
//! reconciles it with the destination schema and merges it through a
//! scoped staging table in a single transaction.

pub mod error;
pub mod reconcile;
pub mod resolver;
pub mod staging;
pub mod upsert;

pub use error::{LoadError, LoadResult};
pub use reconcile::{Reconciled, SchemaReconciler, CREATED_ON, UNIQUE_KEY, UPDATED_ON};
pub use resolver::{DimensionResolver, Resolved};
pub use staging::{StagingTable, UpsertPhase};
pub use upsert::{UpsertEngine, UpsertReport};

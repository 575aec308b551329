//! Natural-key to surrogate-key resolution against dimension tables.
//!
//! [`DimensionResolver::resolve`] hash-joins one natural-key column of a
//! batch against a dimension and writes the matched surrogate ids into the
//! dimension's `<kind>_fk` column. Only the id travels into the batch;
//! descriptive dimension columns never do.

use crate::error::{LoadError, LoadResult};
use hw_core::keys::{collapse_admin_code, fold_case};
use hw_core::{
    Batch, CodeStandard, Config, DimensionKind, DimensionSpec, MatchPolicy, UnmatchedPolicy,
    Value, SURROGATE_KEY,
};
use hw_db::Database;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// How many unmatched keys to show in log lines and errors.
const UNMATCHED_SAMPLE: usize = 10;

type KeyMap = HashMap<String, i64>;

/// Outcome of one resolution pass.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The input batch with the foreign-key column attached.
    pub batch: Batch,
    /// Distinct natural keys (after normalization) with no dimension row.
    pub unmatched_keys: Vec<String>,
    /// Rows removed because their key did not resolve.
    pub dropped: usize,
    /// Rows that received the sentinel id.
    pub substituted: usize,
}

/// Resolves natural keys to surrogate ids.
///
/// Dimension key maps are loaded once per resolver and reused; dimensions
/// change rarely, but call [`clear_cache`](Self::clear_cache) after seeding.
pub struct DimensionResolver<'a> {
    db: &'a dyn Database,
    config: &'a Config,
    cache: RefCell<HashMap<(String, String, CodeStandard), Rc<KeyMap>>>,
}

impl<'a> DimensionResolver<'a> {
    pub fn new(db: &'a dyn Database, config: &'a Config) -> Self {
        Self {
            db,
            config,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Configured matching for `kind`.
    pub fn policy_for(&self, kind: DimensionKind) -> MatchPolicy {
        kind.default_policy(self.config.unknown_cause_id)
    }

    /// Forget all loaded dimension key maps.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Attach `kind`'s foreign key to every row of `batch`, matching
    /// `natural_key_column` per `policy`.
    ///
    /// Null keys count as unmatched. With [`UnmatchedPolicy::Drop`] the
    /// output holds only resolved rows; no row ever leaves with a null
    /// foreign key.
    pub fn resolve(
        &self,
        mut batch: Batch,
        natural_key_column: &str,
        kind: DimensionKind,
        policy: &MatchPolicy,
    ) -> LoadResult<Resolved> {
        let spec = kind.spec(self.config.schema.as_deref());
        let key_idx = batch.require_column(natural_key_column)?;
        let keys = self.key_map(&spec, policy.standard)?;
        let collapse = match kind {
            DimensionKind::Subdivision { level, code } => self.config.collapse_map(level, code),
            _ => None,
        };

        let mut unmatched = BTreeSet::new();
        let ids: Vec<Option<i64>> = batch
            .rows()
            .iter()
            .map(|row| {
                let Some(raw) = natural_key(&row[key_idx], kind) else {
                    unmatched.insert("<null>".to_string());
                    return None;
                };
                let code = match collapse {
                    Some(map) => collapse_admin_code(&raw, map).to_string(),
                    None => raw,
                };
                let key = fold_case(&code, policy.standard);
                let id = keys.get(&key).copied();
                if id.is_none() {
                    unmatched.insert(key);
                }
                id
            })
            .collect();

        let unmatched_rows = ids.iter().filter(|id| id.is_none()).count();
        let unmatched_keys: Vec<String> = unmatched.into_iter().collect();
        let sample = sample_keys(&unmatched_keys);

        let (fk_values, dropped, substituted) = match policy.unmatched {
            UnmatchedPolicy::Drop => {
                let values = ids.iter().map(|id| Value::from(*id)).collect();
                (values, unmatched_rows, 0)
            }
            UnmatchedPolicy::Sentinel(sentinel) => {
                let values = ids
                    .iter()
                    .map(|id| Value::Int(id.unwrap_or(sentinel)))
                    .collect();
                (values, 0, unmatched_rows)
            }
            UnmatchedPolicy::Reject if unmatched_rows > 0 => {
                return Err(LoadError::UnresolvedDimensionKey {
                    dimension: kind.to_string(),
                    count: unmatched_keys.len(),
                    sample,
                });
            }
            UnmatchedPolicy::Reject => {
                let values = ids.iter().map(|id| Value::from(*id)).collect();
                (values, 0, 0)
            }
        };

        batch.set_column(&spec.fk_column, fk_values)?;
        if dropped > 0 {
            batch.retain_rows(|idx, _| ids[idx].is_some());
            log::warn!(
                "Dropped {dropped} row(s) with unresolved {kind} keys in '{natural_key_column}': {sample}"
            );
        }
        if substituted > 0 {
            log::warn!(
                "Mapped {substituted} row(s) with unresolved {kind} keys to sentinel id: {sample}"
            );
        }

        Ok(Resolved {
            batch,
            unmatched_keys,
            dropped,
            substituted,
        })
    }

    /// Natural key → surrogate id for a dimension, loaded on first use.
    fn key_map(&self, spec: &DimensionSpec, standard: CodeStandard) -> LoadResult<Rc<KeyMap>> {
        let cache_key = (spec.table.to_string(), spec.natural_key.clone(), standard);
        if let Some(map) = self.cache.borrow().get(&cache_key) {
            return Ok(Rc::clone(map));
        }

        if !self.db.relation_exists(&spec.table)? {
            return Err(LoadError::MissingTable {
                table: spec.table.to_string(),
            });
        }

        let pairs = self
            .db
            .lookup_keys(&spec.table, &spec.natural_key, SURROGATE_KEY)?;
        let mut map = KeyMap::with_capacity(pairs.len());
        for (key, id) in pairs {
            let Some(key) = key else { continue };
            let key = if standard.folds_dimension_keys() {
                fold_case(&key, standard)
            } else {
                key
            };
            if let Some(&existing) = map.get(&key) {
                if existing != id {
                    return Err(LoadError::AmbiguousDimensionKey {
                        table: spec.table.to_string(),
                        key,
                        first: existing,
                        second: id,
                    });
                }
            }
            map.insert(key, id);
        }
        log::debug!(
            "Loaded {} key(s) from {}.{}",
            map.len(),
            spec.table,
            spec.natural_key
        );

        let map = Rc::new(map);
        self.cache.borrow_mut().insert(cache_key, Rc::clone(&map));
        Ok(map)
    }
}

/// Text form of a natural key as `kind` stores it.
///
/// `calendar_day` is keyed by date, so timestamps match on their day.
fn natural_key(value: &Value, kind: DimensionKind) -> Option<String> {
    match (kind, value) {
        (DimensionKind::CalendarDay, Value::Timestamp(ts)) => Value::Date(ts.date()).key_string(),
        _ => value.key_string(),
    }
}

fn sample_keys(keys: &[String]) -> String {
    let mut sample = keys
        .iter()
        .take(UNMATCHED_SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if keys.len() > UNMATCHED_SAMPLE {
        sample.push_str(&format!(" (+{} more)", keys.len() - UNMATCHED_SAMPLE));
    }
    sample
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;

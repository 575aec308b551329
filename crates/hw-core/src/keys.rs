//! Natural-key normalization applied before any dimension lookup.
//!
//! Case folding is per code standard: ISO codes are matched lower-case, NUTS
//! codes upper-case. Existing warehouse keys were matched under these rules,
//! so the two families stay distinct.

use crate::batch::{Batch, Value};
use crate::error::{CoreError, CoreResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coding scheme of a natural key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStandard {
    /// ISO 3166-1 alpha-2 (`DE`)
    IsoAlpha2,
    /// ISO 3166-1 alpha-3 (`DEU`)
    IsoAlpha3,
    /// ISO 3166-2 subdivision codes (`DE-BY`)
    Iso3166_2,
    /// NUTS family, including `nuts_0`
    Nuts,
    /// Compared verbatim
    Exact,
}

impl CodeStandard {
    /// Whether dimension-side keys are folded too.
    ///
    /// ISO lookups compare folded values on both sides. NUTS lookups fold
    /// only the incoming value, so a lower-case NUTS code stored in a
    /// dimension table never matches.
    pub fn folds_dimension_keys(self) -> bool {
        matches!(
            self,
            CodeStandard::IsoAlpha2 | CodeStandard::IsoAlpha3 | CodeStandard::Iso3166_2
        )
    }
}

/// Many-to-one code remapping applied before a subdivision lookup.
pub type CollapseMap = HashMap<String, String>;

/// Compose the integer key stored on `calendar_week` rows.
///
/// The week is zero-padded to two digits before concatenation, so
/// `(2021, 3)` yields `202103`. `week` must be an ISO week number in
/// `1..=53`; callers validate user input before composing.
pub fn compose_iso_week_key(year: i32, week: u32) -> i64 {
    debug_assert!((1..=53).contains(&week), "ISO week {week} outside 1..=53");
    i64::from(year) * 100 + i64::from(week)
}

/// ISO-8601 (year, week) pair of a date.
///
/// Early January days may belong to the previous ISO year.
pub fn iso_week_of(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

/// Week key of the `calendar_week` row covering `date`.
pub fn iso_week_key_of(date: NaiveDate) -> i64 {
    let (year, week) = iso_week_of(date);
    compose_iso_week_key(year, week)
}

/// Fold a code's case according to its standard.
pub fn fold_case(value: &str, standard: CodeStandard) -> String {
    match standard {
        CodeStandard::IsoAlpha2 | CodeStandard::IsoAlpha3 | CodeStandard::Iso3166_2 => {
            value.to_lowercase()
        }
        CodeStandard::Nuts => value.to_uppercase(),
        CodeStandard::Exact => value.to_string(),
    }
}

/// Replace `code` by its aggregate when the map lists it.
pub fn collapse_admin_code<'a>(code: &'a str, map: &'a CollapseMap) -> &'a str {
    map.get(code).map_or(code, String::as_str)
}

/// Append `out_column` holding the week key composed from a year column and
/// a week column.
pub fn attach_iso_week_key(
    batch: &mut Batch,
    year_column: &str,
    week_column: &str,
    out_column: &str,
) -> CoreResult<()> {
    let year_idx = batch.require_column(year_column)?;
    let week_idx = batch.require_column(week_column)?;

    let keys = batch
        .rows()
        .iter()
        .enumerate()
        .map(|(row, values)| -> CoreResult<Value> {
            let year = values[year_idx].as_key_int();
            let week = values[week_idx].as_key_int();
            match (year, week) {
                (Some(year), Some(week)) if (1..=53).contains(&week) => {
                    let year = i32::try_from(year).map_err(|_| CoreError::InvalidCalendarKey {
                        row,
                        reason: format!("year {year} out of range"),
                    })?;
                    Ok(Value::Int(compose_iso_week_key(year, week as u32)))
                }
                (Some(_), Some(week)) => Err(CoreError::InvalidCalendarKey {
                    row,
                    reason: format!("week {week} outside 1..=53"),
                }),
                _ => Err(CoreError::InvalidCalendarKey {
                    row,
                    reason: format!(
                        "year/week not integral: {} / {}",
                        values[year_idx], values[week_idx]
                    ),
                }),
            }
        })
        .collect::<CoreResult<Vec<_>>>()?;

    batch.set_column(out_column, keys)
}

/// Append `out_column` holding the week key of the ISO week containing each
/// row's date.
pub fn attach_iso_week_key_from_date(
    batch: &mut Batch,
    date_column: &str,
    out_column: &str,
) -> CoreResult<()> {
    let idx = batch.require_column(date_column)?;

    let keys = batch
        .rows()
        .iter()
        .enumerate()
        .map(|(row, values)| match &values[idx] {
            Value::Date(date) => Ok(Value::Int(iso_week_key_of(*date))),
            Value::Timestamp(ts) => Ok(Value::Int(iso_week_key_of(ts.date()))),
            Value::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|date| Value::Int(iso_week_key_of(date)))
                .map_err(|e| CoreError::InvalidCalendarKey {
                    row,
                    reason: format!("'{s}' is not a date: {e}"),
                }),
            other => Err(CoreError::InvalidCalendarKey {
                row,
                reason: format!("'{other}' is not a date"),
            }),
        })
        .collect::<CoreResult<Vec<_>>>()?;

    batch.set_column(out_column, keys)
}

#[cfg(test)]
#[path = "keys_test.rs"]
mod tests;

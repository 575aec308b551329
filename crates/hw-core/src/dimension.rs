//! The closed registry of warehouse dimensions.
//!
//! Every dimension the loader can resolve against is a [`DimensionKind`]
//! variant. The variant alone determines the table, the natural-key column,
//! the code standard used for case folding, and what happens to rows whose
//! key is not found.

use crate::keys::CodeStandard;
use crate::table_name::TableName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate key column shared by all dimension tables.
pub const SURROGATE_KEY: &str = "id";

/// Which country code a batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountryCode {
    IsoAlpha2,
    IsoAlpha3,
    Nuts0,
}

/// Subdivision tier (NUTS 1 to 3 or the national equivalent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SubdivisionLevel {
    One,
    Two,
    Three,
}

impl SubdivisionLevel {
    pub fn number(self) -> u8 {
        match self {
            SubdivisionLevel::One => 1,
            SubdivisionLevel::Two => 2,
            SubdivisionLevel::Three => 3,
        }
    }
}

impl TryFrom<u8> for SubdivisionLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(SubdivisionLevel::One),
            2 => Ok(SubdivisionLevel::Two),
            3 => Ok(SubdivisionLevel::Three),
            other => Err(format!("subdivision level must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<SubdivisionLevel> for u8 {
    fn from(level: SubdivisionLevel) -> Self {
        level.number()
    }
}

/// Which natural-key column of a subdivision tier to match against.
///
/// Several code standards coexist on one tier, e.g. a NUTS code next to a
/// national administrative id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdivisionCode {
    Nuts,
    Iso,
    NationalId,
}

/// Age-group bucketing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeInterval {
    FiveYear,
    TenYear,
    /// Bands used by the Robert Koch Institute
    Rki,
}

/// A dimension the loader can resolve natural keys against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Country(CountryCode),
    Subdivision {
        level: SubdivisionLevel,
        code: SubdivisionCode,
    },
    CalendarYear,
    CalendarWeek,
    CalendarDay,
    AgeGroup(AgeInterval),
    ClassificationIcd10,
    Vaccine,
    VaccineSeries,
}

/// Where and how a dimension is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    pub table: TableName,
    pub natural_key: String,
    pub standard: CodeStandard,
    pub fk_column: String,
}

/// What to do with a row whose natural key is not in the dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedPolicy {
    /// Remove the row from the batch.
    Drop,
    /// Attach a fixed surrogate id instead.
    Sentinel(i64),
    /// Fail the whole batch.
    Reject,
}

/// How a natural key column is matched against a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    pub standard: CodeStandard,
    pub unmatched: UnmatchedPolicy,
}

impl DimensionKind {
    /// Base name shared by the table and the foreign-key column.
    pub fn base_name(self) -> String {
        match self {
            DimensionKind::Country(_) => "country".to_string(),
            DimensionKind::Subdivision { level, .. } => {
                format!("country_subdivision_{}", level.number())
            }
            DimensionKind::CalendarYear => "calendar_year".to_string(),
            DimensionKind::CalendarWeek => "calendar_week".to_string(),
            DimensionKind::CalendarDay => "calendar_day".to_string(),
            DimensionKind::AgeGroup(AgeInterval::FiveYear) => "age_group_05y".to_string(),
            DimensionKind::AgeGroup(AgeInterval::TenYear) => "age_group_10y".to_string(),
            DimensionKind::AgeGroup(AgeInterval::Rki) => "age_group_rki".to_string(),
            DimensionKind::ClassificationIcd10 => "classification_icd10".to_string(),
            DimensionKind::Vaccine => "vaccine".to_string(),
            DimensionKind::VaccineSeries => "vaccine_series".to_string(),
        }
    }

    /// Natural-key column and its code standard.
    fn natural_key(self) -> (String, CodeStandard) {
        match self {
            DimensionKind::Country(CountryCode::IsoAlpha2) => {
                ("iso_3166_1_alpha2".to_string(), CodeStandard::IsoAlpha2)
            }
            DimensionKind::Country(CountryCode::IsoAlpha3) => {
                ("iso_3166_1_alpha3".to_string(), CodeStandard::IsoAlpha3)
            }
            DimensionKind::Country(CountryCode::Nuts0) => ("nuts_0".to_string(), CodeStandard::Nuts),
            DimensionKind::Subdivision { level, code } => match code {
                SubdivisionCode::Nuts => (format!("nuts_{}", level.number()), CodeStandard::Nuts),
                SubdivisionCode::Iso => ("iso_3166_2".to_string(), CodeStandard::Iso3166_2),
                SubdivisionCode::NationalId => ("national_id".to_string(), CodeStandard::Exact),
            },
            DimensionKind::CalendarYear => ("iso_year".to_string(), CodeStandard::Exact),
            DimensionKind::CalendarWeek => ("iso_year_week".to_string(), CodeStandard::Exact),
            DimensionKind::CalendarDay => ("date".to_string(), CodeStandard::Exact),
            DimensionKind::AgeGroup(_) => ("label".to_string(), CodeStandard::Exact),
            DimensionKind::ClassificationIcd10 => ("icd10_code".to_string(), CodeStandard::Exact),
            DimensionKind::Vaccine | DimensionKind::VaccineSeries => {
                ("code".to_string(), CodeStandard::Exact)
            }
        }
    }

    /// Registry entry for this dimension, with tables qualified by `schema`.
    pub fn spec(self, schema: Option<&str>) -> DimensionSpec {
        let base = self.base_name();
        let (natural_key, standard) = self.natural_key();
        DimensionSpec {
            table: TableName::new(base.as_str()).qualify(schema),
            natural_key,
            standard,
            fk_column: format!("{base}_fk"),
        }
    }

    /// Default matching for this dimension.
    ///
    /// Unknown ICD-10 codes map to the "unknown cause" row identified by
    /// `unknown_cause_id`; every other dimension drops unmatched rows.
    pub fn default_policy(self, unknown_cause_id: i64) -> MatchPolicy {
        let (_, standard) = self.natural_key();
        let unmatched = match self {
            DimensionKind::ClassificationIcd10 => UnmatchedPolicy::Sentinel(unknown_cause_id),
            _ => UnmatchedPolicy::Drop,
        };
        MatchPolicy {
            standard,
            unmatched,
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionKind::Country(code) => write!(f, "country({code:?})"),
            DimensionKind::Subdivision { level, code } => {
                write!(f, "country_subdivision_{}({code:?})", level.number())
            }
            other => f.write_str(&other.base_name()),
        }
    }
}

#[cfg(test)]
#[path = "dimension_test.rs"]
mod tests;

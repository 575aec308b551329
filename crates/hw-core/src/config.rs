//! Configuration types and parsing for warehouse.yml

use crate::dimension::{SubdivisionCode, SubdivisionLevel};
use crate::error::{CoreError, CoreResult};
use crate::keys::CollapseMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Loader configuration from warehouse.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Schema qualifying unqualified dimension and fact table names
    #[serde(default)]
    pub schema: Option<String>,

    /// Surrogate id of the "unknown cause" ICD-10 row
    #[serde(default = "default_unknown_cause_id")]
    pub unknown_cause_id: i64,

    /// Staging table settings for upserts
    #[serde(default)]
    pub staging: StagingConfig,

    /// Subdivision code collapse maps
    #[serde(default)]
    pub collapse: Vec<CollapseRule>,

    /// Per-table override of the columns forming the unique key.
    /// Tables not listed use every `*_fk` column in declaration order.
    #[serde(default)]
    pub unique_keys: HashMap<String, Vec<String>>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (file or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

/// Staging table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// Name prefix; a random suffix is appended per upsert
    #[serde(default = "default_staging_prefix")]
    pub prefix: String,

    /// How many fresh names to try when a staging name is taken
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            prefix: default_staging_prefix(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Many-to-one remapping of subdivision codes for one tier and code column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollapseRule {
    pub level: SubdivisionLevel,
    pub code: SubdivisionCode,
    pub map: CollapseMap,
}

fn default_db_path() -> String {
    "warehouse.duckdb".to_string()
}

fn default_unknown_cause_id() -> i64 {
    -1
}

fn default_staging_prefix() -> String {
    "stg_".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            schema: None,
            unknown_cause_id: default_unknown_cause_id(),
            staging: StagingConfig::default(),
            collapse: Vec::new(),
            unique_keys: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml(&content)?;
        log::debug!("Loaded warehouse config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a directory containing warehouse.yml or
    /// warehouse.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("warehouse.yml");
        let yaml_path = dir.join("warehouse.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        let prefix = &self.staging.prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "staging.prefix '{prefix}' must be non-empty and contain only [a-z0-9_]"
                ),
            });
        }

        if self.staging.max_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "staging.max_attempts must be at least 1".to_string(),
            });
        }

        if let Some(schema) = &self.schema {
            if schema.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "schema must not be empty when set".to_string(),
                });
            }
        }

        for (i, rule) in self.collapse.iter().enumerate() {
            let duplicate = self.collapse[..i]
                .iter()
                .any(|other| other.level == rule.level && other.code == rule.code);
            if duplicate {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "duplicate collapse rule for level {} / {:?}",
                        rule.level.number(),
                        rule.code
                    ),
                });
            }
        }

        for (table, columns) in &self.unique_keys {
            if columns.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("unique_keys.{table} must list at least one column"),
                });
            }
        }

        Ok(())
    }

    /// Collapse map for a subdivision tier and code column, if configured.
    pub fn collapse_map(
        &self,
        level: SubdivisionLevel,
        code: SubdivisionCode,
    ) -> Option<&CollapseMap> {
        self.collapse
            .iter()
            .find(|rule| rule.level == level && rule.code == code)
            .map(|rule| &rule.map)
    }

    /// Configured unique-key columns for `table`, matched on the name as
    /// given or on its unqualified part.
    pub fn unique_key_columns(&self, table: &str) -> Option<&[String]> {
        let (_, bare) = crate::sql_utils::split_qualified_name(table);
        self.unique_keys
            .get(table)
            .or_else(|| self.unique_keys.get(bare))
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

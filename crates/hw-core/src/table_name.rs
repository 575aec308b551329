//! Strongly-typed table name wrapper.

use crate::sql_utils::{quote_qualified, split_qualified_name};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Name of a warehouse table, optionally schema-qualified (`schema.table`).
///
/// Keeps dimension and fact table names apart from column names and other
/// free-form strings passed around the loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    /// Create a new `TableName`, panicking in debug builds if the name is empty.
    pub fn new(name: impl Into<String>) -> Self {
        let s = name.into();
        debug_assert!(!s.is_empty(), "TableName must not be empty");
        Self(s)
    }

    /// Try to create a new `TableName`, returning `None` if the name is empty.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Prefix an unqualified name with `schema`. Already-qualified names and
    /// a `None` schema leave the name untouched.
    pub fn qualify(&self, schema: Option<&str>) -> Self {
        match schema {
            Some(schema) if !self.0.contains('.') => Self(format!("{schema}.{}", self.0)),
            _ => self.clone(),
        }
    }

    /// `(schema, table)`; the schema defaults to `main`.
    pub fn parts(&self) -> (&str, &str) {
        split_qualified_name(&self.0)
    }

    /// The name quoted for direct use in SQL.
    pub fn quoted(&self) -> String {
        quote_qualified(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for TableName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TableName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<&str> for TableName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

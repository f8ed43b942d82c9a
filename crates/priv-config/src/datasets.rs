//! Dataset variant catalog.
//!
//! Each masking technique is one named variant of the same logical dataset.
//! Schema and row key are declared here, never inferred from the data; a
//! variant may override either when its masking changed the column types
//! (a hashed integer column becomes text).

use std::collections::BTreeMap;
use std::path::PathBuf;

use priv_core::{ColumnType, Schema};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_raw() -> String {
    "raw".to_string()
}

fn default_row_key() -> String {
    "id".to_string()
}

/// Storage format of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// One JSON object per line.
    #[default]
    Jsonl,
    /// A table in a DuckDB database file.
    Duckdb,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VariantConfig {
    #[serde(default)]
    pub format: SourceFormat,

    /// JSONL file or DuckDB database file.
    pub path: PathBuf,

    /// Table (or view) to read from a DuckDB database. Defaults to the
    /// variant name.
    #[serde(default)]
    pub table: Option<String>,

    /// Column types replacing the shared schema for this variant.
    #[serde(default)]
    pub schema: Option<BTreeMap<String, ColumnType>>,

    #[serde(default)]
    pub row_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetsConfig {
    /// Name of the unmasked variant.
    #[serde(default = "default_raw")]
    pub raw: String,

    /// Row-key column shared by all variants.
    #[serde(default = "default_row_key")]
    pub row_key: String,

    /// Column name → declared type, shared by all variants.
    #[serde(default)]
    pub schema: BTreeMap<String, ColumnType>,

    /// Loaders fail on datasets larger than this instead of truncating.
    #[serde(default)]
    pub max_rows: Option<usize>,

    #[serde(default)]
    pub variants: BTreeMap<String, VariantConfig>,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            raw: default_raw(),
            row_key: default_row_key(),
            schema: BTreeMap::new(),
            max_rows: None,
            variants: BTreeMap::new(),
        }
    }
}

impl DatasetsConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.variants.is_empty()
    }

    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&VariantConfig> {
        self.variants.get(name)
    }

    /// Declared schema of a variant, columns in name order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] if neither the variant nor the
    /// shared section declares any column.
    pub fn schema_for(&self, name: &str) -> Result<Schema, ConfigError> {
        let columns = self
            .variant(name)
            .and_then(|v| v.schema.as_ref())
            .unwrap_or(&self.schema);
        if columns.is_empty() {
            return Err(ConfigError::NotConfigured {
                section: format!("datasets.schema ({name})"),
            });
        }
        Ok(columns.iter().map(|(c, t)| (c.as_str(), *t)).collect())
    }

    /// Row-key column of a variant.
    #[must_use]
    pub fn row_key_for(&self, name: &str) -> &str {
        self.variant(name)
            .and_then(|v| v.row_key.as_deref())
            .unwrap_or(&self.row_key)
    }

    /// Configured variant names, raw first.
    #[must_use]
    pub fn variant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variants.keys().map(String::as_str).collect();
        names.sort_by_key(|n| (*n != self.raw, *n));
        names
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn catalog() -> DatasetsConfig {
        let variant = |path: &str| VariantConfig {
            format: SourceFormat::Jsonl,
            path: PathBuf::from(path),
            table: None,
            schema: None,
            row_key: None,
        };
        let mut hashed = variant("hash.jsonl");
        hashed.schema = Some(BTreeMap::from([
            ("id".to_string(), ColumnType::Integer),
            ("age".to_string(), ColumnType::Text),
        ]));
        DatasetsConfig {
            schema: BTreeMap::from([
                ("id".to_string(), ColumnType::Integer),
                ("age".to_string(), ColumnType::Integer),
            ]),
            variants: BTreeMap::from([
                ("hash".to_string(), hashed),
                ("raw".to_string(), variant("raw.jsonl")),
                ("generalize".to_string(), variant("gen.jsonl")),
            ]),
            ..DatasetsConfig::default()
        }
    }

    #[test]
    fn raw_variant_listed_first() {
        assert_eq!(catalog().variant_names(), vec!["raw", "generalize", "hash"]);
    }

    #[test]
    fn variant_schema_overrides_shared() {
        let config = catalog();
        assert_eq!(config.schema_for("raw").unwrap().type_of("age"), Some(ColumnType::Integer));
        assert_eq!(config.schema_for("hash").unwrap().type_of("age"), Some(ColumnType::Text));
        assert_eq!(config.row_key_for("hash"), "id");
    }

    #[test]
    fn missing_schema_is_not_configured() {
        let config = DatasetsConfig::default();
        assert!(matches!(
            config.schema_for("raw"),
            Err(ConfigError::NotConfigured { .. })
        ));
        assert!(!config.is_configured());
    }
}

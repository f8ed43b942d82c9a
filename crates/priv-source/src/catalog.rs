//! Configured variant catalog.

use priv_config::{DatasetsConfig, SourceFormat};
use priv_core::Dataset;

use crate::{DataSource, SourceError, jsonl, table};

/// Variants declared in the `[datasets]` configuration section.
///
/// Relative paths resolve against the working directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    config: DatasetsConfig,
}

impl Catalog {
    #[must_use]
    pub const fn from_config(config: DatasetsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &DatasetsConfig {
        &self.config
    }

    /// Name of the unmasked variant.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.config.raw
    }
}

impl DataSource for Catalog {
    fn load(&self, variant: &str) -> Result<Dataset, SourceError> {
        let entry = self
            .config
            .variant(variant)
            .ok_or_else(|| SourceError::MissingVariant {
                variant: variant.to_string(),
            })?;
        let schema = self.config.schema_for(variant)?;
        let row_key = self.config.row_key_for(variant);
        let max_rows = self.config.max_rows;

        tracing::info!(variant, format = ?entry.format, path = %entry.path.display(), "loading variant");
        match entry.format {
            SourceFormat::Jsonl => jsonl::load(variant, &entry.path, schema, row_key, max_rows),
            SourceFormat::Duckdb => {
                let table_name = entry.table.as_deref().unwrap_or(variant);
                table::load(variant, &entry.path, table_name, schema, row_key, max_rows)
            }
        }
    }

    fn variants(&self) -> Vec<String> {
        self.config
            .variant_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

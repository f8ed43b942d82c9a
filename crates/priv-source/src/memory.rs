//! In-memory variant source.

use std::collections::BTreeMap;

use priv_core::Dataset;

use crate::{DataSource, SourceError};

/// Variants held in memory, keyed by dataset name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: BTreeMap<String, Dataset>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variant under its dataset name, replacing any previous one.
    #[must_use]
    pub fn with(mut self, dataset: Dataset) -> Self {
        self.insert(dataset);
        self
    }

    pub fn insert(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.name().to_string(), dataset);
    }
}

impl FromIterator<Dataset> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Dataset>>(iter: I) -> Self {
        let mut source = Self::new();
        for dataset in iter {
            source.insert(dataset);
        }
        source
    }
}

impl DataSource for MemorySource {
    fn load(&self, variant: &str) -> Result<Dataset, SourceError> {
        self.datasets
            .get(variant)
            .cloned()
            .ok_or_else(|| SourceError::MissingVariant {
                variant: variant.to_string(),
            })
    }

    fn variants(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use priv_core::{ColumnType, Schema, Value};

    use super::*;

    #[test]
    fn serves_inserted_variants() {
        let schema = Schema::new().with("id", ColumnType::Integer);
        let raw = Dataset::new("raw", schema, "id", vec![vec![Value::Int(1)]]).unwrap();
        let source = MemorySource::new().with(raw.renamed("hash")).with(raw);

        assert_eq!(source.variants(), vec!["hash".to_string(), "raw".to_string()]);
        assert_eq!(source.load("hash").unwrap().name(), "hash");
        assert!(matches!(
            source.load("noise"),
            Err(SourceError::MissingVariant { .. })
        ));
    }
}

//! Adversary knowledge datasets.
//!
//! An auxiliary dataset is what a linkage attacker holds: quasi-identifier
//! values plus a ground-truth identity label per record, and no row key.

use crate::dataset::{Dataset, Schema};
use crate::errors::CoreError;
use crate::value::Value;

/// One adversary record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryRecord {
    /// Ground-truth identity label.
    pub identity: Value,
    /// Cells aligned with the auxiliary schema.
    pub cells: Vec<Value>,
}

impl AuxiliaryRecord {
    #[must_use]
    pub fn get(&self, index: usize) -> &Value {
        self.cells.get(index).unwrap_or(&Value::Null)
    }
}

/// Collection of adversary records sharing a schema.
#[derive(Debug, Clone)]
pub struct AuxiliaryDataset {
    name: String,
    schema: Schema,
    records: Vec<AuxiliaryRecord>,
}

impl AuxiliaryDataset {
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Schema, records: Vec<AuxiliaryRecord>) -> Self {
        Self {
            name: name.into(),
            schema,
            records,
        }
    }

    /// Turn a loaded dataset into adversary knowledge, taking identities from
    /// `identity_column`. Every column (including the identity) stays visible.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if the identity column is absent.
    pub fn from_dataset(dataset: &Dataset, identity_column: &str) -> Result<Self, CoreError> {
        let identity_index = dataset.column_index(identity_column)?;
        let records = dataset
            .rows()
            .iter()
            .map(|row| AuxiliaryRecord {
                identity: row.get(identity_index).clone(),
                cells: row.cells().to_vec(),
            })
            .collect();
        Ok(Self::new(dataset.name(), dataset.schema().clone(), records))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn records(&self) -> &[AuxiliaryRecord] {
        &self.records
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Schema index of a column.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if the column is not declared.
    pub fn column_index(&self, column: &str) -> Result<usize, CoreError> {
        self.schema
            .index_of(column)
            .ok_or_else(|| CoreError::UnknownColumn {
                dataset: self.name.clone(),
                column: column.to_string(),
            })
    }
}

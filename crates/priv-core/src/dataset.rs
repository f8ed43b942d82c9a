//! Immutable, schema-checked datasets.
//!
//! A [`Dataset`] holds rows as positional cells aligned with its [`Schema`].
//! Construction validates cell types, the row width, and row-key uniqueness;
//! after that the dataset is read-only for the rest of the analysis run.

use std::collections::{HashMap, HashSet};

use crate::errors::CoreError;
use crate::value::{ColumnType, Value};

/// Ordered column declarations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
}

impl Schema {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Append a column (builder style).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push((name.into(), ty));
        self
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(col, _)| col == name)
    }

    #[must_use]
    pub fn type_of(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, ty)| *ty)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

impl<S: Into<String>> FromIterator<(S, ColumnType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (S, ColumnType)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }
}

/// One record, positionally aligned with the dataset schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    /// Cell at a schema index. Out-of-range indexes read as null.
    #[must_use]
    pub fn get(&self, index: usize) -> &Value {
        self.cells.get(index).unwrap_or(&Value::Null)
    }

    #[must_use]
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }
}

/// A named, immutable collection of rows with a declared row-key column.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    schema: Schema,
    row_key: String,
    key_index: usize,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from positional rows.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnknownColumn`] if `row_key` is not in the schema.
    /// - [`CoreError::RowWidth`] if a row does not match the schema width.
    /// - [`CoreError::TypeMismatch`] if a cell does not fit its column type.
    /// - [`CoreError::MissingRowKey`] if a row key is null.
    /// - [`CoreError::DuplicateRowKey`] if two rows share a key.
    pub fn new(
        name: impl Into<String>,
        schema: Schema,
        row_key: impl Into<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        let row_key = row_key.into();
        let key_index = schema
            .index_of(&row_key)
            .ok_or_else(|| CoreError::UnknownColumn {
                dataset: name.clone(),
                column: row_key.clone(),
            })?;

        let mut seen: HashSet<&Value> = HashSet::with_capacity(rows.len());
        for (row_idx, cells) in rows.iter().enumerate() {
            if cells.len() != schema.len() {
                return Err(CoreError::RowWidth {
                    dataset: name,
                    row: row_idx,
                    expected: schema.len(),
                    found: cells.len(),
                });
            }
            for (cell, (column, ty)) in cells.iter().zip(schema.columns()) {
                if !cell.fits(ty) {
                    return Err(CoreError::TypeMismatch {
                        column: column.to_string(),
                        expected: ty,
                        found: cell.kind_name().to_string(),
                    });
                }
            }
            let key = &cells[key_index];
            if key.is_null() {
                return Err(CoreError::MissingRowKey {
                    dataset: name,
                    column: row_key,
                    row: row_idx,
                });
            }
            if !seen.insert(key) {
                return Err(CoreError::DuplicateRowKey {
                    dataset: name,
                    key: key.to_string(),
                });
            }
        }
        drop(seen);

        Ok(Self {
            name,
            schema,
            row_key,
            key_index,
            rows: rows.into_iter().map(Row::new).collect(),
        })
    }

    /// Build a dataset from column-name → value records.
    ///
    /// Columns absent from a record read as null; keys not in the schema are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::new`].
    pub fn from_records<I>(
        name: impl Into<String>,
        schema: Schema,
        row_key: impl Into<String>,
        records: I,
    ) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = HashMap<String, Value>>,
    {
        let rows: Vec<Vec<Value>> = records
            .into_iter()
            .map(|mut record| {
                schema
                    .names()
                    .map(|col| record.remove(col).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self::new(name, schema, row_key, rows)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Name of the row-key column.
    #[must_use]
    pub fn row_key_column(&self) -> &str {
        &self.row_key
    }

    #[must_use]
    pub const fn row_key_index(&self) -> usize {
        self.key_index
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The row key of a row belonging to this dataset.
    #[must_use]
    pub fn key_of<'a>(&self, row: &'a Row) -> &'a Value {
        row.get(self.key_index)
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

    /// All cells of one column, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if the column is not declared.
    pub fn column(&self, column: &str) -> Result<impl Iterator<Item = &Value>, CoreError> {
        let index = self.column_index(column)?;
        Ok(self.rows.iter().map(move |row| row.get(index)))
    }

    /// A copy of this dataset under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

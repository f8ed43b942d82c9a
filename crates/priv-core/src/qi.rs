//! Quasi-identifier specs and generalization functions.
//!
//! A [`QuasiIdentifierSpec`] names the columns an adversary could combine to
//! single out a record, each with an optional [`Generalization`] applied
//! before grouping. Binding a spec to a [`Schema`] resolves column indexes and
//! rejects generalizations that do not fit the column type, so the per-row
//! key computation ([`BoundSpec::key`]) cannot fail.
//!
//! Null cells generalize to null under every function, so nulls always form
//! their own equivalence class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Row, Schema};
use crate::errors::CoreError;
use crate::value::{ColumnType, Value};

/// Generalized quasi-identifier tuple. One cell per spec field, in order.
pub type QiKey = Vec<Value>;

fn default_category() -> String {
    "Other".to_string()
}

/// A deterministic generalization applied to one quasi-identifier column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generalization {
    /// Keep the value as is.
    #[default]
    Identity,
    /// Floor a numeric value to a multiple of `width` (age 37, width 5 → 35).
    Bucket { width: i64 },
    /// Keep the first `len` characters of a text value.
    Prefix { len: usize },
    /// Recode text categories; unmapped values become `default`.
    Map {
        table: BTreeMap<String, String>,
        #[serde(default = "default_category")]
        default: String,
    },
    /// The column was irreversibly transformed (e.g. hashed). Grouping keeps
    /// the stored value; linkage treats the field as unmatchable.
    Opaque,
}

impl Generalization {
    #[must_use]
    pub const fn bucket(width: i64) -> Self {
        Self::Bucket { width }
    }

    #[must_use]
    pub const fn prefix(len: usize) -> Self {
        Self::Prefix { len }
    }

    /// Category recoding with the `Other` fallback.
    #[must_use]
    pub fn map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            default: default_category(),
        }
    }

    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque)
    }

    /// Short label used in spec labels and report parameters.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Identity => String::new(),
            Self::Bucket { width } => format!("bucket{width}"),
            Self::Prefix { len } => format!("prefix{len}"),
            Self::Map { .. } => "map".to_string(),
            Self::Opaque => "opaque".to_string(),
        }
    }

    /// Check that this generalization can be applied to a column of `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSpec`] for a non-positive bucket width, a
    /// zero prefix length, or a function that does not fit the column type.
    pub fn check(&self, column: &str, ty: ColumnType) -> Result<(), CoreError> {
        match self {
            Self::Identity | Self::Opaque => Ok(()),
            Self::Bucket { width } if *width <= 0 => Err(CoreError::InvalidSpec(format!(
                "bucket width for '{column}' must be positive, got {width}"
            ))),
            Self::Bucket { .. } if !ty.is_numeric() => Err(CoreError::InvalidSpec(format!(
                "bucket generalization needs a numeric column, '{column}' is {ty}"
            ))),
            Self::Prefix { len: 0 } => Err(CoreError::InvalidSpec(format!(
                "prefix length for '{column}' must be positive"
            ))),
            Self::Prefix { .. } | Self::Map { .. } if ty != ColumnType::Text => {
                Err(CoreError::InvalidSpec(format!(
                    "{} generalization needs a text column, '{column}' is {ty}",
                    self.label()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Generalize one cell. Callers are expected to have run [`check`](Self::check);
    /// cells of an unexpected type pass through unchanged.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            // The lowest bucket's bound would fall below i64::MIN; it is
            // clamped there instead, which keeps bucketing idempotent.
            (Self::Bucket { width }, Value::Int(x)) => {
                Value::Int(x.div_euclid(*width).saturating_mul(*width))
            }
            (Self::Bucket { width }, Value::Real(x)) => {
                let w = *width as f64;
                Value::Real((x / w).floor() * w)
            }
            (Self::Prefix { len }, Value::Text(s)) => Value::Text(s.chars().take(*len).collect()),
            (Self::Map { table, default }, Value::Text(s)) => Value::Text(
                table
                    .get(s.trim())
                    .cloned()
                    .unwrap_or_else(|| default.clone()),
            ),
            (_, other) => other.clone(),
        }
    }
}

/// One column of a quasi-identifier spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QiField {
    pub column: String,
    #[serde(default)]
    pub generalization: Generalization,
}

impl QiField {
    pub fn new(column: impl Into<String>, generalization: Generalization) -> Self {
        Self {
            column: column.into(),
            generalization,
        }
    }

    fn label(&self) -> String {
        let g = self.generalization.label();
        if g.is_empty() {
            self.column.clone()
        } else {
            format!("{}:{g}", self.column)
        }
    }
}

/// Ordered quasi-identifier columns with optional generalizations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuasiIdentifierSpec {
    /// Human-readable name used in reports. Derived from the fields if empty.
    #[serde(default)]
    pub name: String,
    pub fields: Vec<QiField>,
}

impl QuasiIdentifierSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Spec over plain columns with no generalization.
    pub fn of_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            name: String::new(),
            fields: columns
                .iter()
                .map(|c| QiField::new(c.as_ref(), Generalization::Identity))
                .collect(),
        }
    }

    /// Append a generalized column (builder style).
    #[must_use]
    pub fn field(mut self, column: impl Into<String>, generalization: Generalization) -> Self {
        self.fields.push(QiField::new(column, generalization));
        self
    }

    /// Append a column with no generalization (builder style).
    #[must_use]
    pub fn column(self, column: impl Into<String>) -> Self {
        self.field(column, Generalization::Identity)
    }

    /// Report label: the explicit name, or `age:bucket5+sex` style.
    #[must_use]
    pub fn label(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.fields
            .iter()
            .map(QiField::label)
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Resolve the spec against a schema.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidSpec`] if the spec has no fields or a
    ///   generalization does not fit its column.
    /// - [`CoreError::UnknownColumn`] if a field names an undeclared column.
    pub fn bind(&self, schema: &Schema, dataset: &str) -> Result<BoundSpec, CoreError> {
        if self.fields.is_empty() {
            return Err(CoreError::InvalidSpec(
                "quasi-identifier spec has no columns".to_string(),
            ));
        }

        let fields = self
            .fields
            .iter()
            .map(|field| {
                let index =
                    schema
                        .index_of(&field.column)
                        .ok_or_else(|| CoreError::UnknownColumn {
                            dataset: dataset.to_string(),
                            column: field.column.clone(),
                        })?;
                let ty = schema.type_of(&field.column).unwrap_or(ColumnType::Text);
                field.generalization.check(&field.column, ty)?;
                Ok((index, field.generalization.clone()))
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(BoundSpec {
            label: self.label(),
            fields,
        })
    }
}

/// A spec resolved against one schema.
#[derive(Debug, Clone)]
pub struct BoundSpec {
    label: String,
    fields: Vec<(usize, Generalization)>,
}

impl BoundSpec {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Generalized QI tuple of a dataset row.
    #[must_use]
    pub fn key(&self, row: &Row) -> QiKey {
        self.key_with(|index| row.get(index))
    }

    /// Generalized QI tuple from any positional cell accessor.
    pub fn key_with<'a>(&self, cell: impl Fn(usize) -> &'a Value) -> QiKey {
        self.fields
            .iter()
            .map(|(index, generalization)| generalization.apply(cell(*index)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with("id", ColumnType::Integer)
            .with("age", ColumnType::Integer)
            .with("income", ColumnType::Real)
            .with("zip", ColumnType::Text)
            .with("education", ColumnType::Text)
    }

    #[test]
    fn bucket_floors_like_integer_division() {
        let g = Generalization::bucket(5);
        assert_eq!(g.apply(&Value::Int(37)), Value::Int(35));
        assert_eq!(g.apply(&Value::Int(35)), Value::Int(35));
        assert_eq!(g.apply(&Value::Int(-1)), Value::Int(-5));
        assert_eq!(g.apply(&Value::Real(12.5)), Value::Real(10.0));
        assert_eq!(g.apply(&Value::Null), Value::Null);
    }

    #[test]
    fn bucket_clamps_at_integer_extremes() {
        let g = Generalization::bucket(3);
        assert_eq!(g.apply(&Value::Int(i64::MIN)), Value::Int(i64::MIN));
        assert_eq!(g.apply(&Value::Int(i64::MIN + 1)), Value::Int(i64::MIN));
        assert_eq!(g.apply(&g.apply(&Value::Int(i64::MIN))), Value::Int(i64::MIN));
        assert_eq!(g.apply(&Value::Int(i64::MAX)), Value::Int(i64::MAX - 1));
    }

    #[test]
    fn prefix_and_map() {
        assert_eq!(
            Generalization::prefix(3).apply(&Value::text("02139")),
            Value::text("021")
        );
        let education = Generalization::map([("Bachelors", "College"), ("Masters", "Graduate")]);
        assert_eq!(
            education.apply(&Value::text(" Masters ")),
            Value::text("Graduate")
        );
        assert_eq!(education.apply(&Value::text("?")), Value::text("Other"));
    }

    #[test]
    fn bind_rejects_bad_specs() {
        let s = schema();
        assert!(matches!(
            QuasiIdentifierSpec::default().bind(&s, "ds"),
            Err(CoreError::InvalidSpec(_))
        ));
        assert!(matches!(
            QuasiIdentifierSpec::of_columns(&["ssn"]).bind(&s, "ds"),
            Err(CoreError::UnknownColumn { .. })
        ));
        assert!(matches!(
            QuasiIdentifierSpec::new("")
                .field("zip", Generalization::bucket(10))
                .bind(&s, "ds"),
            Err(CoreError::InvalidSpec(_))
        ));
        assert!(matches!(
            QuasiIdentifierSpec::new("")
                .field("age", Generalization::bucket(0))
                .bind(&s, "ds"),
            Err(CoreError::InvalidSpec(_))
        ));
        assert!(matches!(
            QuasiIdentifierSpec::new("")
                .field("age", Generalization::prefix(2))
                .bind(&s, "ds"),
            Err(CoreError::InvalidSpec(_))
        ));
    }

    #[test]
    fn bound_spec_builds_keys_in_field_order() {
        let spec = QuasiIdentifierSpec::new("")
            .field("zip", Generalization::prefix(3))
            .field("age", Generalization::bucket(10));
        let bound = spec.bind(&schema(), "ds").unwrap();
        let row = Row::new(vec![
            Value::Int(1),
            Value::Int(47),
            Value::Real(1.0),
            Value::text("02139"),
            Value::text("HS-grad"),
        ]);
        assert_eq!(bound.key(&row), vec![Value::text("021"), Value::Int(40)]);
        assert_eq!(bound.label(), "zip:prefix3+age:bucket10");
    }

    #[test]
    fn generalization_deserializes_from_tagged_form() {
        let field: QiField =
            serde_json::from_str(r#"{"column":"age","generalization":{"kind":"bucket","width":5}}"#)
                .unwrap();
        assert_eq!(field.generalization, Generalization::bucket(5));

        let plain: QiField = serde_json::from_str(r#"{"column":"sex"}"#).unwrap();
        assert_eq!(plain.generalization, Generalization::Identity);

        let map: Generalization =
            serde_json::from_str(r#"{"kind":"map","table":{"9th":"High-School"}}"#).unwrap();
        assert_eq!(map.apply(&Value::text("Doctorate")), Value::text("Other"));
    }
}

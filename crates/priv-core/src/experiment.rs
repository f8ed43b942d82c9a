//! Linkage-attack and DP-query definitions.

use serde::{Deserialize, Serialize};

use crate::qi::{Generalization, QiField, QuasiIdentifierSpec};

// ---------------------------------------------------------------------------
// Linkage
// ---------------------------------------------------------------------------

/// Matching policy for one quasi-identifier in a linkage attack.
///
/// `masked` is applied to the published cell and `auxiliary` to the
/// adversary's raw cell before the two are compared for equality. A field
/// marked [`Generalization::Opaque`] on either side cannot be linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageField {
    pub column: String,
    #[serde(default)]
    pub masked: Generalization,
    #[serde(default)]
    pub auxiliary: Generalization,
}

impl LinkageField {
    /// Values must be equal.
    pub fn exact(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            masked: Generalization::Identity,
            auxiliary: Generalization::Identity,
        }
    }

    /// The published cell holds bucket lower bounds; the adversary's value
    /// matches when it falls inside `[lower, lower + width)`.
    pub fn bucket(column: impl Into<String>, width: i64) -> Self {
        Self {
            column: column.into(),
            masked: Generalization::bucket(width),
            auxiliary: Generalization::bucket(width),
        }
    }

    /// The published cell was already generalized with `generalization`;
    /// only the adversary's value needs the same treatment.
    pub fn generalized(column: impl Into<String>, generalization: Generalization) -> Self {
        Self {
            column: column.into(),
            masked: Generalization::Identity,
            auxiliary: generalization,
        }
    }

    /// The published cell was irreversibly transformed.
    pub fn opaque(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            masked: Generalization::Opaque,
            auxiliary: Generalization::Opaque,
        }
    }

    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.masked.is_opaque() || self.auxiliary.is_opaque()
    }
}

/// Fields an adversary joins on, plus where the published identity lives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkageSpec {
    pub fields: Vec<LinkageField>,
    /// Column of the masked dataset holding the identity compared against
    /// the adversary's label. Defaults to the row key.
    #[serde(default)]
    pub identity_column: Option<String>,
}

impl LinkageSpec {
    #[must_use]
    pub const fn new(fields: Vec<LinkageField>) -> Self {
        Self {
            fields,
            identity_column: None,
        }
    }

    #[must_use]
    pub fn with_identity_column(mut self, column: impl Into<String>) -> Self {
        self.identity_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn has_opaque_field(&self) -> bool {
        self.fields.iter().any(LinkageField::is_opaque)
    }

    /// Grouping spec applied to the masked dataset.
    #[must_use]
    pub fn masked_spec(&self) -> QuasiIdentifierSpec {
        self.side_spec(|f| &f.masked)
    }

    /// Grouping spec applied to the adversary's records.
    #[must_use]
    pub fn auxiliary_spec(&self) -> QuasiIdentifierSpec {
        self.side_spec(|f| &f.auxiliary)
    }

    fn side_spec(&self, pick: impl Fn(&LinkageField) -> &Generalization) -> QuasiIdentifierSpec {
        QuasiIdentifierSpec {
            name: String::new(),
            fields: self
                .fields
                .iter()
                .map(|f| QiField::new(f.column.clone(), pick(f).clone()))
                .collect(),
        }
    }

    /// Columns the adversary needs to know.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }
}

// ---------------------------------------------------------------------------
// DP queries
// ---------------------------------------------------------------------------

/// Aggregate computed by a DP query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    Count,
    Sum { column: String },
    Mean { column: String },
}

impl Aggregate {
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Count => None,
            Self::Sum { column } | Self::Mean { column } => Some(column),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum { .. } => "sum",
            Self::Mean { .. } => "mean",
        }
    }
}

/// Post-processing applied to every noised answer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClampPolicy {
    #[default]
    None,
    NonNegative,
    AtLeast { min: f64 },
}

impl ClampPolicy {
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::NonNegative => value.max(0.0),
            Self::AtLeast { min } => value.max(min),
        }
    }
}

/// A query whose answer is released through the Laplace mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpQuery {
    pub name: String,
    pub aggregate: Aggregate,
    /// Answer the aggregate per group instead of over the whole dataset.
    #[serde(default)]
    pub group_by: Option<QuasiIdentifierSpec>,
    #[serde(default)]
    pub clamp: ClampPolicy,
}

impl DpQuery {
    pub fn new(name: impl Into<String>, aggregate: Aggregate) -> Self {
        Self {
            name: name.into(),
            aggregate,
            group_by: None,
            clamp: ClampPolicy::None,
        }
    }

    #[must_use]
    pub fn grouped_by(mut self, spec: QuasiIdentifierSpec) -> Self {
        self.group_by = Some(spec);
        self
    }

    #[must_use]
    pub const fn clamped(mut self, clamp: ClampPolicy) -> Self {
        self.clamp = clamp;
        self
    }
}

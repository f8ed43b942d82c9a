//! Metric and error classification enums.
//!
//! Both enums serialize as `snake_case` strings and appear verbatim in every
//! result record, so renaming a variant is a record format change.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MetricKind
// ---------------------------------------------------------------------------

/// Which analysis produced a result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    KAnonymity,
    DpAccuracy,
    Linkage,
    Utility,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KAnonymity => "k_anonymity",
            Self::DpAccuracy => "dp_accuracy",
            Self::Linkage => "linkage",
            Self::Utility => "utility",
        }
    }

    /// Every kind, in report order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::KAnonymity, Self::DpAccuracy, Self::Linkage, Self::Utility]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Classification of a failed or skipped experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A parameter is out of range (ε ≤ 0, k = 0, trials = 0, ...).
    InvalidParameter,
    /// A configured dataset variant is not available.
    MissingVariant,
    /// The input is structurally unusable for the metric.
    DegenerateInput,
    /// A size or time limit was exceeded.
    ResourceExhaustion,
    /// A column or cell does not match the declared schema.
    SchemaViolation,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid_parameter",
            Self::MissingVariant => "missing_variant",
            Self::DegenerateInput => "degenerate_input",
            Self::ResourceExhaustion => "resource_exhaustion",
            Self::SchemaViolation => "schema_violation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

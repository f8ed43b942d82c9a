//! Linkage and utility experiment sections.

use priv_core::{LinkageField, LinkageSpec, QuasiIdentifierSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkageConfig {
    /// Quasi-identifiers the adversary joins on, with per-field policy.
    #[serde(default)]
    pub fields: Vec<LinkageField>,

    /// Masked-side identity column. Defaults to the row key.
    #[serde(default)]
    pub identity_column: Option<String>,

    /// Variant to use as adversary knowledge. When unset, records are
    /// sampled from the raw variant.
    #[serde(default)]
    pub auxiliary: Option<String>,

    /// Identity column of the `auxiliary` variant. Defaults to its row key.
    #[serde(default)]
    pub auxiliary_identity_column: Option<String>,
}

impl LinkageConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.fields.is_empty()
    }

    #[must_use]
    pub fn spec(&self) -> LinkageSpec {
        LinkageSpec {
            fields: self.fields.clone(),
            identity_column: self.identity_column.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UtilityConfig {
    /// Columns compared value-by-value against the raw variant.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Groupings whose per-group counts are compared against the raw variant.
    #[serde(default)]
    pub group_by: Vec<QuasiIdentifierSpec>,
}

impl UtilityConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.columns.is_empty() || !self.group_by.is_empty()
    }
}

//! Result record envelope.
//!
//! Every metric computation, successful or not, produces exactly one
//! [`MetricRecord`], appended as one JSONL line to the experiment's result
//! file. A failed configuration is recorded explicitly so "measured zero
//! risk" and "could not measure" never look the same downstream.
//!
//! The `v` field versions the record layout. Files written without it
//! deserialize with `v == 1`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ErrorKind, MetricKind};

const fn default_record_version() -> u32 {
    1
}

/// Outcome of one metric computation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The metric was computed. `values` holds the metric-specific report.
    Measured { values: serde_json::Value },
    /// The configuration was attempted and failed.
    Failed {
        error_kind: ErrorKind,
        message: String,
    },
    /// The configuration was not attempted (missing variant, deadline).
    Skipped {
        error_kind: ErrorKind,
        message: String,
    },
}

impl Outcome {
    /// Wrap a serializable report.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the report cannot become JSON.
    pub fn measured<T: Serialize>(report: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Measured {
            values: serde_json::to_value(report)?,
        })
    }

    pub fn failed(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            error_kind,
            message: message.into(),
        }
    }

    pub fn skipped(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Skipped {
            error_kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_measured(&self) -> bool {
        matches!(self, Self::Measured { .. })
    }

    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Measured { .. } => None,
            Self::Failed { error_kind, .. } | Self::Skipped { error_kind, .. } => Some(*error_kind),
        }
    }
}

/// One line of an experiment's result file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MetricRecord {
    /// Record layout version. Defaults to 1 for records without this field.
    #[serde(default = "default_record_version")]
    pub v: u32,

    /// Run that produced this record.
    pub experiment_id: String,

    pub metric_kind: MetricKind,

    /// Dataset variant the metric was computed on (e.g. `raw`, `hash`).
    pub dataset_variant: String,

    /// Inputs that identify the configuration: k, epsilon, QI spec label,
    /// query name, column, ...
    pub parameters: serde_json::Value,

    pub outcome: Outcome,

    pub timestamp: DateTime<Utc>,
}

impl MetricRecord {
    /// Build a record stamped with the current time.
    pub fn new(
        experiment_id: impl Into<String>,
        metric_kind: MetricKind,
        dataset_variant: impl Into<String>,
        parameters: serde_json::Value,
        outcome: Outcome,
    ) -> Self {
        Self {
            v: default_record_version(),
            experiment_id: experiment_id.into(),
            metric_kind,
            dataset_variant: dataset_variant.into(),
            parameters,
            outcome,
            timestamp: Utc::now(),
        }
    }
}

/// Closing summary of an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunSummary {
    pub experiment_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `false` when the run deadline passed before every configuration
    /// started.
    pub complete: bool,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Configurations never started because of the deadline.
    pub not_started: usize,
}

impl RunSummary {
    /// Records written during the run.
    #[must_use]
    pub const fn recorded(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn outcome_is_tagged_by_status() {
        let failed = Outcome::failed(ErrorKind::InvalidParameter, "epsilon must be positive");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "status": "failed",
                "error_kind": "invalid_parameter",
                "message": "epsilon must be positive"
            })
        );
        assert_eq!(failed.error_kind(), Some(ErrorKind::InvalidParameter));

        let measured = Outcome::measured(&json!({"min_class_size": 3})).unwrap();
        assert!(measured.is_measured());
        assert_eq!(measured.error_kind(), None);
    }

    #[test]
    fn record_defaults_version() {
        let json = r#"{
            "experiment_id": "exp-00000001",
            "metric_kind": "linkage",
            "dataset_variant": "hash",
            "parameters": {},
            "outcome": {"status": "skipped", "error_kind": "missing_variant", "message": "absent"},
            "timestamp": "2026-03-01T10:00:00Z"
        }"#;
        let record: MetricRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.v, 1);
        assert_eq!(record.metric_kind, MetricKind::Linkage);
        assert_eq!(record.outcome.error_kind(), Some(ErrorKind::MissingVariant));
    }

    #[test]
    fn record_roundtrip() {
        let record = MetricRecord::new(
            "exp-a3f8b2c1",
            MetricKind::KAnonymity,
            "raw",
            json!({"k": 5, "qi": "age:bucket5+sex"}),
            Outcome::measured(&json!({"is_k_anonymous": true})).unwrap(),
        );
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        let back: MetricRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }
}

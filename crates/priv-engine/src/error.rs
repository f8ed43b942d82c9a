//! Analysis error types for priv-engine.

use priv_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Errors raised by the analyzers.
///
/// Every error aborts only the configuration that raised it; the sweep
/// runner turns it into a failure record via [`EngineError::kind`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// A parameter is out of range (ε ≤ 0, k = 0, trials = 0, empty spec, ...).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A dataset variant the configuration needs is not available.
    #[error("Dataset variant '{variant}' is not available")]
    MissingVariant { variant: String },

    /// The input cannot produce a meaningful value for this metric.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// A size limit was exceeded.
    #[error("Resource limit exceeded: {0}")]
    ResourceExhaustion(String),

    /// Schema or spec binding failure from the data model.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Classification written into failure records.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) | Self::Core(CoreError::InvalidSpec(_)) => {
                ErrorKind::InvalidParameter
            }
            Self::MissingVariant { .. } => ErrorKind::MissingVariant,
            Self::DegenerateInput(_) => ErrorKind::DegenerateInput,
            Self::ResourceExhaustion(_) => ErrorKind::ResourceExhaustion,
            Self::Core(_) => ErrorKind::SchemaViolation,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            EngineError::invalid("k must be positive").kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            EngineError::from(CoreError::InvalidSpec("empty".into())).kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            EngineError::from(CoreError::UnknownColumn {
                dataset: "raw".into(),
                column: "zip".into(),
            })
            .kind(),
            ErrorKind::SchemaViolation
        );
        assert_eq!(
            EngineError::MissingVariant {
                variant: "hash".into()
            }
            .kind(),
            ErrorKind::MissingVariant
        );
    }
}

//! Loader error types.

use std::path::PathBuf;

use priv_config::ConfigError;
use priv_core::{CoreError, ErrorKind};

/// Errors that can occur while loading a dataset variant.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The variant is not in the catalog.
    #[error("Dataset variant '{variant}' is not configured")]
    MissingVariant { variant: String },

    /// The variant's file could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cell could not be decoded as its declared column type.
    #[error("Variant '{variant}', record {record}, column '{column}': {reason}")]
    Decode {
        variant: String,
        record: usize,
        column: String,
        reason: String,
    },

    /// The variant has more rows than the configured limit.
    #[error("Variant '{variant}' exceeds the {limit}-row limit")]
    ResourceExhaustion { variant: String, limit: usize },

    /// `DuckDB` operation failed.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// The decoded rows violate the dataset schema.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The variant's catalog entry is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SourceError {
    /// Classification written into failure records.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingVariant { .. } => ErrorKind::MissingVariant,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::MissingVariant
            }
            Self::Io { .. } | Self::DuckDb(_) => ErrorKind::DegenerateInput,
            Self::ResourceExhaustion { .. } => ErrorKind::ResourceExhaustion,
            Self::Decode { .. } | Self::Core(_) => ErrorKind::SchemaViolation,
            Self::Config(_) => ErrorKind::InvalidParameter,
        }
    }
}

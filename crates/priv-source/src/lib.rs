//! # priv-source
//!
//! Dataset variant loaders for privbench.
//!
//! Every variant is materialized into an immutable [`Dataset`] against the
//! schema declared in configuration:
//! - `jsonl` variants are read one JSON object per line
//! - `duckdb` variants are read from a table of a `DuckDB` database file
//!   ([`table`])
//!
//! [`Catalog`] dispatches by configured format; [`MemorySource`] serves
//! datasets already built in memory.

pub mod catalog;
pub mod table;
pub mod error;
pub mod jsonl;
pub mod memory;

pub use catalog::Catalog;
pub use error::SourceError;
pub use memory::MemorySource;

use priv_core::Dataset;

/// A named collection of dataset variants.
pub trait DataSource: Send + Sync {
    /// Materialize one variant.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingVariant`] for unknown names, or the
    /// loader's error if the variant cannot be read against its schema.
    fn load(&self, variant: &str) -> Result<Dataset, SourceError>;

    /// Names of every variant this source can load.
    fn variants(&self) -> Vec<String>;
}

/// Fail once a loader has read more rows than `limit` allows.
pub(crate) fn check_limit(
    variant: &str,
    rows: usize,
    limit: Option<usize>,
) -> Result<(), SourceError> {
    match limit {
        Some(limit) if rows > limit => Err(SourceError::ResourceExhaustion {
            variant: variant.to_string(),
            limit,
        }),
        _ => Ok(()),
    }
}

//! # priv-sink
//!
//! Durable store for metric records.
//!
//! Each experiment appends one JSON record per line to
//! `{directory}/{experiment_id}.jsonl` and closes with a
//! `{experiment_id}.summary.json` file. Records already appended stay valid
//! when a run stops early.

pub mod error;
pub mod jsonl;
pub mod memory;

pub use error::SinkError;
pub use jsonl::{JsonlSink, read_records};
pub use memory::MemorySink;

use priv_core::{MetricRecord, RunSummary};

/// Destination for metric records.
///
/// Implementations serialize concurrent appends internally; callers share
/// one sink across worker threads.
pub trait ResultSink: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record cannot be stored.
    fn append(&self, record: &MetricRecord) -> Result<(), SinkError>;

    /// Store the closing summary of a run.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the summary cannot be stored.
    fn finish(&self, summary: &RunSummary) -> Result<(), SinkError>;
}

//! In-memory sink for tests and one-shot commands.

use std::sync::Mutex;

use priv_core::{MetricRecord, RunSummary};

use crate::{ResultSink, SinkError};

#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<MetricRecord>>,
    summary: Mutex<Option<RunSummary>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Poisoned`] if a writer panicked.
    pub fn records(&self) -> Result<Vec<MetricRecord>, SinkError> {
        self.records
            .lock()
            .map(|r| r.clone())
            .map_err(|_| SinkError::Poisoned)
    }

    /// Summary stored by [`ResultSink::finish`], if any.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Poisoned`] if a writer panicked.
    pub fn summary(&self) -> Result<Option<RunSummary>, SinkError> {
        self.summary
            .lock()
            .map(|s| s.clone())
            .map_err(|_| SinkError::Poisoned)
    }
}

impl ResultSink for MemorySink {
    fn append(&self, record: &MetricRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(record.clone());
        Ok(())
    }

    fn finish(&self, summary: &RunSummary) -> Result<(), SinkError> {
        *self.summary.lock().map_err(|_| SinkError::Poisoned)? = Some(summary.clone());
        Ok(())
    }
}

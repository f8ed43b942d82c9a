//! JSONL result files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use priv_core::{MetricRecord, RunSummary};

use crate::{ResultSink, SinkError};

/// Appends records to per-experiment JSONL files.
pub struct JsonlSink {
    directory: PathBuf,
    enabled: bool,
    lock: Mutex<()>,
}

impl JsonlSink {
    /// Create a sink writing under `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| SinkError::Io {
            path: directory.clone(),
            source,
        })?;
        Ok(Self {
            directory,
            enabled: true,
            lock: Mutex::new(()),
        })
    }

    /// A sink that accepts and drops every record.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            directory: PathBuf::new(),
            enabled: false,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Result file of an experiment.
    #[must_use]
    pub fn records_path(&self, experiment_id: &str) -> PathBuf {
        self.directory.join(format!("{experiment_id}.jsonl"))
    }

    /// Summary file of an experiment.
    #[must_use]
    pub fn summary_path(&self, experiment_id: &str) -> PathBuf {
        self.directory.join(format!("{experiment_id}.summary.json"))
    }
}

impl ResultSink for JsonlSink {
    fn append(&self, record: &MetricRecord) -> Result<(), SinkError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.records_path(&record.experiment_id);
        let _guard = self.lock.lock().map_err(|_| SinkError::Poisoned)?;
        serde_jsonlines::append_json_lines(&path, [record])
            .map_err(|source| SinkError::Io { path, source })
    }

    fn finish(&self, summary: &RunSummary) -> Result<(), SinkError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.summary_path(&summary.experiment_id);
        let _guard = self.lock.lock().map_err(|_| SinkError::Poisoned)?;
        let file = File::create(&path).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        write_summary(&path, file, summary)?;
        tracing::debug!(path = %path.display(), "wrote run summary");
        Ok(())
    }
}

/// Pretty-print `summary` and flush, so a failed final write is reported.
fn write_summary(path: &Path, writer: impl Write, summary: &RunSummary) -> Result<(), SinkError> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every record of a result file, in append order.
///
/// # Errors
///
/// Returns [`SinkError::Io`] if the file cannot be read or a line does not
/// parse as a record.
pub fn read_records(path: &Path) -> Result<Vec<MetricRecord>, SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    serde_jsonlines::json_lines(path)
        .map_err(io_err)?
        .collect::<Result<Vec<MetricRecord>, _>>()
        .map_err(io_err)
}

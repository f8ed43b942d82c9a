//! Result sink configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_directory() -> PathBuf {
    PathBuf::from("results")
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SinkConfig {
    /// Directory receiving `{experiment_id}.jsonl` result files.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// When false, records are computed and printed but not written.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            enabled: default_enabled(),
        }
    }
}

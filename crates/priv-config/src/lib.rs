//! # priv-config
//!
//! Layered configuration loading for privbench using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`PRIVBENCH_*` prefix, `__` as separator)
//! 2. An explicit file passed on the command line (`--config`)
//! 3. Project-level `.privbench/config.toml`
//! 4. User-level `~/.config/privbench/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `PRIVBENCH_ANALYSIS__TRIALS` -> `analysis.trials`,
//! `PRIVBENCH_SINK__DIRECTORY` -> `sink.directory`, etc. Lists are written
//! inline: `PRIVBENCH_ANALYSIS__K_VALUES=[2,5,10]`.
//!
//! # Usage
//!
//! ```no_run
//! use priv_config::PrivConfig;
//!
//! let config = PrivConfig::load_with_dotenv().expect("config");
//! config.analysis.validate().expect("valid sweep");
//! for name in config.datasets.variant_names() {
//!     println!("variant: {name}");
//! }
//! ```

mod analysis;
mod datasets;
mod error;
mod experiments;
mod sink;

pub use analysis::AnalysisConfig;
pub use datasets::{DatasetsConfig, SourceFormat, VariantConfig};
pub use error::ConfigError;
pub use experiments::{LinkageConfig, UtilityConfig};
pub use sink::SinkConfig;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use priv_core::{DpQuery, QuasiIdentifierSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrivConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub quasi_identifiers: Vec<QuasiIdentifierSpec>,
    #[serde(default)]
    pub linkage: LinkageConfig,
    #[serde(default)]
    pub utility: UtilityConfig,
    #[serde(default)]
    pub dp_queries: Vec<DpQuery>,
    /// Query name → L1 sensitivity of its answer.
    #[serde(default)]
    pub sensitivity_by_query: BTreeMap<String, f64>,
    #[serde(default)]
    pub datasets: DatasetsConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

impl PrivConfig {
    /// Load configuration from all default sources (TOML files + env).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env`
    /// support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with an extra TOML file layered above the project
    /// file and below the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] if `path` does not exist, or
    /// [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotConfigured {
                section: path.display().to_string(),
            });
        }
        Self::figment_with(Some(path))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Calls `dotenvy` to load the `.env` file from the workspace root before
    /// building the figment. This is the typical entry point for the CLI.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the default provider chain.
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_with(None)
    }

    /// Build the provider chain with an optional explicit config file.
    #[must_use]
    pub fn figment_with(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".privbench/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Explicit file
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 4: Environment variables (highest priority)
        figment.merge(Env::prefixed("PRIVBENCH_").split("__"))
    }

    /// Sensitivity configured for a DP query.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotConfigured`] if the query has no entry.
    /// - [`ConfigError::InvalidValue`] if the entry is not positive.
    pub fn sensitivity(&self, query: &str) -> Result<f64, ConfigError> {
        let value = self
            .sensitivity_by_query
            .get(query)
            .copied()
            .ok_or_else(|| ConfigError::NotConfigured {
                section: format!("sensitivity_by_query.{query}"),
            })?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::invalid(
                format!("sensitivity_by_query.{query}"),
                format!("sensitivity must be positive, got {value}"),
            ))
        }
    }

    /// Variants selected for analysis: the configured subset, or all.
    #[must_use]
    pub fn selected_variants(&self) -> Vec<String> {
        if self.analysis.variants.is_empty() {
            self.datasets
                .variant_names()
                .into_iter()
                .map(str::to_string)
                .collect()
        } else {
            self.analysis.variants.clone()
        }
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("privbench").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) looking for a `.env`
    /// file, then falls back to the current directory. Missing files are
    /// ignored.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = PrivConfig::default();
        assert!(!config.datasets.is_configured());
        assert!(!config.linkage.is_configured());
        assert!(!config.utility.is_configured());
        assert!(config.sink.enabled);
        assert_eq!(config.analysis.trials, 30);
    }

    #[test]
    fn sensitivity_lookup() {
        let mut config = PrivConfig::default();
        config.sensitivity_by_query.insert("count_all".into(), 1.0);
        config.sensitivity_by_query.insert("broken".into(), 0.0);
        assert!((config.sensitivity("count_all").unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(matches!(
            config.sensitivity("missing"),
            Err(ConfigError::NotConfigured { .. })
        ));
        assert!(matches!(
            config.sensitivity("broken"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn explicit_variant_selection_wins() {
        let mut config = PrivConfig::default();
        config.analysis.variants = vec!["hash".into()];
        assert_eq!(config.selected_variants(), vec!["hash".to_string()]);
    }
}

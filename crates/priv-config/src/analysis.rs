//! Sweep parameters shared by every analysis.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_k_values() -> Vec<usize> {
    vec![2, 5, 10, 20]
}

fn default_epsilons() -> Vec<f64> {
    vec![0.1, 0.5, 1.0, 5.0]
}

const fn default_trials() -> usize {
    30
}

const fn default_auxiliary_sample_size() -> usize {
    1000
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// k values swept by the k-anonymity analysis.
    #[serde(default = "default_k_values")]
    pub k_values: Vec<usize>,

    /// Privacy budgets swept by the DP accuracy analysis.
    #[serde(default = "default_epsilons")]
    pub epsilons: Vec<f64>,

    /// Independent noise draws per epsilon.
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Run seed. Unset means a fresh OS-seeded source per run.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Configurations not started within this many seconds are skipped.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    /// Raw records drawn as adversary knowledge for linkage.
    #[serde(default = "default_auxiliary_sample_size")]
    pub auxiliary_sample_size: usize,

    /// Variants to analyze. Empty means every configured variant.
    #[serde(default)]
    pub variants: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            k_values: default_k_values(),
            epsilons: default_epsilons(),
            trials: default_trials(),
            seed: None,
            run_timeout_secs: None,
            auxiliary_sample_size: default_auxiliary_sample_size(),
            variants: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Check that k, epsilon and trial settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k_values.is_empty() {
            return Err(ConfigError::invalid("analysis.k_values", "no k values"));
        }
        if self.k_values.contains(&0) {
            return Err(ConfigError::invalid("analysis.k_values", "k must be at least 1"));
        }
        if self.epsilons.is_empty() {
            return Err(ConfigError::invalid("analysis.epsilons", "no epsilon values"));
        }
        if let Some(eps) = self.epsilons.iter().find(|e| !e.is_finite() || **e <= 0.0) {
            return Err(ConfigError::invalid(
                "analysis.epsilons",
                format!("epsilon must be positive, got {eps}"),
            ));
        }
        if self.trials == 0 {
            return Err(ConfigError::invalid("analysis.trials", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = AnalysisConfig::default();
        assert_eq!(config.k_values, vec![2, 5, 10, 20]);
        assert_eq!(config.epsilons, vec![0.1, 0.5, 1.0, 5.0]);
        assert_eq!(config.trials, 30);
        assert_eq!(config.auxiliary_sample_size, 1000);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AnalysisConfig {
            k_values: vec![3, 0],
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "analysis.k_values"
        ));

        config.k_values = vec![3];
        config.epsilons = vec![1.0, -0.5];
        assert!(config.validate().is_err());

        config.epsilons = vec![1.0];
        config.trials = 0;
        assert!(config.validate().is_err());
    }
}

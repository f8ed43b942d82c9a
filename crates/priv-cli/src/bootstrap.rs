use anyhow::Context;
use priv_config::PrivConfig;

use crate::cli::GlobalFlags;

/// Load layered configuration, honoring `--config`.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<PrivConfig> {
    match &flags.config {
        Some(path) => {
            let _ = dotenvy::dotenv();
            PrivConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => PrivConfig::load_with_dotenv().context("failed to load privbench config"),
    }
}

/// Fail with a pointer to the missing section when the dataset catalog is
/// empty.
pub fn require_datasets(config: &PrivConfig) -> anyhow::Result<()> {
    if config.datasets.is_configured() {
        Ok(())
    } else {
        anyhow::bail!(
            "no dataset variants configured; add [datasets.variants.<name>] to .privbench/config.toml"
        )
    }
}

use anyhow::Context;
use priv_config::PrivConfig;
use priv_core::{AuxiliaryDataset, Dataset};
use priv_engine::{LinkageResult, attack};
use priv_source::{Catalog, DataSource};
use serde::Serialize;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::commands::LinkArgs;
use crate::output::output;
use crate::progress::Progress;
use crate::runner::{adversary_source, configured_adversary, sampled_adversary};

#[derive(Debug, Serialize)]
struct LinkReport {
    variant: String,
    auxiliary: String,
    #[serde(flatten)]
    result: LinkageResult,
}

/// Handle `privbench link`.
pub fn handle(args: &LinkArgs, config: &PrivConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    bootstrap::require_datasets(config)?;
    if !config.linkage.is_configured() {
        anyhow::bail!("no linkage fields configured; add [[linkage.fields]] to the config");
    }

    let mut config = config.clone();
    if let Some(size) = args.sample_size {
        config.analysis.auxiliary_sample_size = size;
    }

    let spinner = Progress::spinner("preparing linkage attack");
    let prepared = prepare(args, &config);
    spinner.finish_clear();
    let (masked, auxiliary) = prepared?;

    let result = attack(&masked, &auxiliary, &config.linkage.spec())
        .with_context(|| format!("linkage attack on '{}' failed", args.variant))?;
    output(
        &LinkReport {
            variant: args.variant.clone(),
            auxiliary: auxiliary.name().to_string(),
            result,
        },
        flags.format,
    )
}

/// Load the target variant and build the adversary's knowledge.
fn prepare(args: &LinkArgs, config: &PrivConfig) -> anyhow::Result<(Dataset, AuxiliaryDataset)> {
    let catalog = Catalog::from_config(config.datasets.clone());
    let load = |name: &str| {
        catalog
            .load(name)
            .with_context(|| format!("failed to load variant '{name}'"))
    };

    let masked = load(&args.variant)?;
    let auxiliary = match &config.linkage.auxiliary {
        Some(name) => configured_adversary(config, &load(name)?)?,
        None => {
            let raw = load(catalog.raw())?;
            let mut noise = adversary_source(args.seed.or(config.analysis.seed));
            sampled_adversary(config, &raw, &mut noise)?
        }
    };
    Ok((masked, auxiliary))
}

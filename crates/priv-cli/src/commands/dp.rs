use anyhow::Context;
use priv_config::{AnalysisConfig, ConfigError, PrivConfig};
use priv_engine::dp;
use serde_json::Value;

use crate::cli::GlobalFlags;
use crate::cli::commands::DpArgs;
use crate::output::output;
use crate::runner::noise_source;

/// Handle `privbench dp`.
pub fn handle(args: &DpArgs, config: &PrivConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let analysis = analysis(args, config).context("invalid DP settings")?;
    let mut noise = noise_source(analysis.seed, 0);

    let results = dp::evaluate(
        args.true_value,
        args.sensitivity,
        &analysis.epsilons,
        analysis.trials,
        &mut noise,
    )?;

    let mut rendered = serde_json::to_value(&results)?;
    if !args.values {
        if let Value::Array(items) = &mut rendered {
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                item.remove("noised_values");
            }
        }
    }
    output(&rendered, flags.format)
}

/// Analysis settings with `--epsilon`, `--trials` and `--seed` applied.
fn analysis(args: &DpArgs, config: &PrivConfig) -> Result<AnalysisConfig, ConfigError> {
    let mut analysis = config.analysis.clone();
    if !args.epsilons.is_empty() {
        analysis.epsilons.clone_from(&args.epsilons);
    }
    if let Some(trials) = args.trials {
        analysis.trials = trials;
    }
    if args.seed.is_some() {
        analysis.seed = args.seed;
    }
    analysis.validate()?;
    Ok(analysis)
}

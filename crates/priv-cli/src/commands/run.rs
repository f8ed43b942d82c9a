use anyhow::Context;
use priv_config::PrivConfig;
use priv_sink::JsonlSink;
use priv_source::Catalog;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::commands::RunArgs;
use crate::output::output;
use crate::progress::Progress;
use crate::runner::Sweep;

/// Handle `privbench run`.
pub fn handle(args: &RunArgs, mut config: PrivConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    bootstrap::require_datasets(&config)?;
    if args.seed.is_some() {
        config.analysis.seed = args.seed;
    }
    if args.timeout_secs.is_some() {
        config.analysis.run_timeout_secs = args.timeout_secs;
    }
    if !args.variants.is_empty() {
        config.analysis.variants.clone_from(&args.variants);
    }

    let experiment_id = args
        .experiment_id
        .clone()
        .unwrap_or_else(priv_core::ids::new_experiment_id);
    let sink = if config.sink.enabled {
        JsonlSink::new(&config.sink.directory).with_context(|| {
            format!(
                "failed to prepare result directory {}",
                config.sink.directory.display()
            )
        })?
    } else {
        JsonlSink::disabled()
    };
    let catalog = Catalog::from_config(config.datasets.clone());

    let progress = Progress::bar(0, &format!("sweep {experiment_id}"));
    let result = Sweep::new(&config, &catalog, &sink, experiment_id).run(&progress);
    let summary = match result {
        Ok(summary) => {
            progress.finish_clear();
            summary
        }
        Err(error) => {
            progress.finish_err("sweep aborted");
            return Err(error).context("failed to write results");
        }
    };

    if sink.is_enabled() {
        tracing::info!(
            path = %sink.records_path(&summary.experiment_id).display(),
            "results written"
        );
    }
    output(&summary, flags.format)
}

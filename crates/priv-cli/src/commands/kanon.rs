use anyhow::Context;
use priv_config::{AnalysisConfig, ConfigError, PrivConfig};
use priv_core::QuasiIdentifierSpec;
use priv_engine::{KAnonymityReport, assess};
use priv_source::{Catalog, DataSource};
use serde::Serialize;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::commands::KanonArgs;
use crate::output::output;
use crate::progress::Progress;

#[derive(Debug, Serialize)]
struct KanonRow {
    variant: String,
    qi_spec: String,
    #[serde(flatten)]
    report: KAnonymityReport,
}

/// Handle `privbench kanon`.
pub fn handle(args: &KanonArgs, config: &PrivConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    bootstrap::require_datasets(config)?;
    let analysis = analysis(args, config).context("invalid k-anonymity settings")?;
    let k_values = &analysis.k_values;
    let specs = if args.columns.is_empty() {
        config.quasi_identifiers.clone()
    } else {
        vec![QuasiIdentifierSpec::of_columns(&args.columns)]
    };
    if specs.is_empty() {
        anyhow::bail!("no quasi-identifiers: pass --columns or configure [[quasi_identifiers]]");
    }

    let spinner = Progress::spinner(&format!("loading {}", args.variant));
    let dataset = Catalog::from_config(config.datasets.clone())
        .load(&args.variant)
        .with_context(|| format!("failed to load variant '{}'", args.variant));
    spinner.finish_clear();
    let dataset = dataset?;

    let mut rows = Vec::new();
    for spec in &specs {
        let label = spec.label();
        let reports = assess(&dataset, spec, k_values)
            .with_context(|| format!("k-anonymity under '{label}' failed"))?;
        rows.extend(reports.into_values().map(|report| KanonRow {
            variant: args.variant.clone(),
            qi_spec: label.clone(),
            report,
        }));
    }
    output(&rows, flags.format)
}

/// Analysis settings with `-k` applied, checked before any data is loaded.
fn analysis(args: &KanonArgs, config: &PrivConfig) -> Result<AnalysisConfig, ConfigError> {
    let mut analysis = config.analysis.clone();
    if !args.k_values.is_empty() {
        analysis.k_values.clone_from(&args.k_values);
    }
    analysis.validate()?;
    Ok(analysis)
}

use anyhow::Context;
use priv_config::PrivConfig;
use priv_engine::{AggregateUtilityResult, UtilityResult, aggregate_error, compare_columns};
use priv_source::{Catalog, DataSource};
use serde::Serialize;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::commands::UtilityArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum UtilityRow {
    Column(UtilityResult),
    Aggregate(AggregateUtilityResult),
}

/// Handle `privbench utility`.
pub fn handle(args: &UtilityArgs, config: &PrivConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    bootstrap::require_datasets(config)?;
    let columns = if args.columns.is_empty() {
        &config.utility.columns
    } else {
        &args.columns
    };
    if columns.is_empty() && config.utility.group_by.is_empty() {
        anyhow::bail!("nothing to compare: pass --column or configure [utility]");
    }

    let catalog = Catalog::from_config(config.datasets.clone());
    let raw = catalog
        .load(catalog.raw())
        .with_context(|| format!("failed to load raw variant '{}'", catalog.raw()))?;
    let masked = catalog
        .load(&args.variant)
        .with_context(|| format!("failed to load variant '{}'", args.variant))?;

    let mut rows: Vec<UtilityRow> = compare_columns(&raw, &masked, columns)?
        .into_iter()
        .map(UtilityRow::Column)
        .collect();
    for spec in &config.utility.group_by {
        rows.push(UtilityRow::Aggregate(aggregate_error(&raw, &masked, spec)?));
    }
    output(&rows, flags.format)
}

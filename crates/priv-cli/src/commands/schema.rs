use priv_core::{MetricRecord, RunSummary};

use crate::cli::GlobalFlags;
use crate::cli::commands::{SchemaArgs, SchemaKind};
use crate::output::output;

/// Handle `privbench schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = match args.kind {
        SchemaKind::Record => schemars::schema_for!(MetricRecord),
        SchemaKind::Summary => schemars::schema_for!(RunSummary),
    };
    output(&schema, flags.format)
}

use clap::{Args, Subcommand, ValueEnum};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run every configured analysis over every selected variant.
    Run(RunArgs),
    /// k-anonymity of one variant under the configured quasi-identifiers.
    Kanon(KanonArgs),
    /// Laplace-mechanism accuracy for a single true value.
    Dp(DpArgs),
    /// Linkage attack against one variant.
    Link(LinkArgs),
    /// Utility loss of one variant against the raw data.
    Utility(UtilityArgs),
    /// Print the JSON Schema of result files.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Experiment ID for the result file (generated when omitted).
    #[arg(long)]
    pub experiment_id: Option<String>,

    /// Override `analysis.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override `analysis.run_timeout_secs`.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Restrict the run to these variants (repeatable).
    #[arg(long = "variant")]
    pub variants: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct KanonArgs {
    /// Variant to assess.
    #[arg(long)]
    pub variant: String,

    /// k values (comma-separated); defaults to `analysis.k_values`.
    #[arg(short = 'k', long = "k", value_delimiter = ',')]
    pub k_values: Vec<usize>,

    /// Ad-hoc quasi-identifier columns (comma-separated, no
    /// generalization); defaults to the configured specs.
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct DpArgs {
    /// Exact answer of the query being released.
    #[arg(long, allow_negative_numbers = true)]
    pub true_value: f64,

    /// L1 sensitivity of the query.
    #[arg(long)]
    pub sensitivity: f64,

    /// Privacy budgets (comma-separated); defaults to `analysis.epsilons`.
    #[arg(long = "epsilon", value_delimiter = ',')]
    pub epsilons: Vec<f64>,

    /// Noise draws per epsilon; defaults to `analysis.trials`.
    #[arg(long)]
    pub trials: Option<usize>,

    /// Seed for reproducible draws; defaults to `analysis.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include every noised value in the output.
    #[arg(long)]
    pub values: bool,
}

#[derive(Clone, Debug, Args)]
pub struct LinkArgs {
    /// Variant to attack.
    #[arg(long)]
    pub variant: String,

    /// Adversary sample size; defaults to `analysis.auxiliary_sample_size`.
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Seed for the adversary sample; defaults to `analysis.seed`.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Args)]
pub struct UtilityArgs {
    /// Masked variant to compare with the raw variant.
    #[arg(long)]
    pub variant: String,

    /// Columns to compare (comma-separated); defaults to `utility.columns`.
    #[arg(long = "column", value_delimiter = ',')]
    pub columns: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SchemaKind {
    /// One line of an experiment's result file.
    Record,
    /// The closing run summary.
    Summary,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    #[arg(value_enum, default_value = "record")]
    pub kind: SchemaKind,
}

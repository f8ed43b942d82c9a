use std::path::PathBuf;

use clap::Parser;

pub mod commands;
pub mod global;

pub use commands::Commands;
pub use global::{GlobalFlags, OutputFormat};

/// Top-level CLI parser for the `privbench` binary.
#[derive(Debug, Parser)]
#[command(
    name = "privbench",
    version,
    about = "privbench - privacy risk and utility assessment for masked datasets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra TOML config file, layered above `.privbench/config.toml`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::commands::SchemaKind;
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "privbench",
            "--format",
            "table",
            "--verbose",
            "--config",
            "bench.toml",
            "run",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.verbose);
        assert_eq!(cli.global_flags().config.as_deref(), Some("bench.toml".as_ref()));
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["privbench", "schema", "--format", "raw", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::Schema(ref args) if args.kind == SchemaKind::Record
        ));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["privbench", "--format", "xml", "schema"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn kanon_accepts_comma_separated_k() {
        let cli = Cli::try_parse_from(["privbench", "kanon", "--variant", "raw", "-k", "2,5,10"])
            .expect("cli should parse");
        let Commands::Kanon(args) = cli.command else {
            panic!("expected kanon");
        };
        assert_eq!(args.variant, "raw");
        assert_eq!(args.k_values, vec![2, 5, 10]);
        assert!(args.columns.is_empty());
    }

    #[test]
    fn dp_accepts_negative_true_value() {
        let cli = Cli::try_parse_from([
            "privbench",
            "dp",
            "--true-value",
            "-12.5",
            "--sensitivity",
            "1",
            "--epsilon",
            "0.1,1",
            "--seed",
            "9",
        ])
        .expect("cli should parse");
        let Commands::Dp(args) = cli.command else {
            panic!("expected dp");
        };
        assert!((args.true_value + 12.5).abs() < f64::EPSILON);
        assert_eq!(args.epsilons, vec![0.1, 1.0]);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.trials, None);
    }

    #[test]
    fn run_collects_repeated_variants() {
        let cli = Cli::try_parse_from([
            "privbench",
            "run",
            "--variant",
            "raw",
            "--variant",
            "hash",
            "--timeout-secs",
            "60",
        ])
        .expect("cli should parse");
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.variants, vec!["raw".to_string(), "hash".to_string()]);
        assert_eq!(args.timeout_secs, Some(60));
    }
}

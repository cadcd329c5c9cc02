//! CLI command definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colloquy::{ConcurrencyLimit, PayloadWeight};
use std::path::PathBuf;

/// Colloquy - batch LLM analysis with classified retry and bounded concurrency
#[derive(Parser, Debug)]
#[command(name = "colloquy")]
#[command(about = "Batch LLM analysis with classified retry and bounded concurrency", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a JSON Lines batch
    Run(RunArgs),

    /// List configured model profiles
    Models {
        /// Configuration file layered over the bundled defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Arguments of `colloquy run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Batch file, one {"id","model","instructions","conversation"} object per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Results file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file layered over the bundled defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Payload weight class selecting the concurrency tier
    #[arg(long, value_enum, default_value = "default")]
    pub weight: WeightArg,

    /// Explicit in-flight limit, overriding --weight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Earlier results file; ids that succeeded there are skipped
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

impl RunArgs {
    /// Concurrency limit selected by the flags.
    pub fn limit(&self) -> ConcurrencyLimit {
        match self.concurrency {
            Some(n) => ConcurrencyLimit::Fixed(n),
            None => ConcurrencyLimit::Weight(self.weight.into()),
        }
    }
}

/// Payload weight options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightArg {
    /// Long documents or verbose instructions
    Heavy,
    /// Typical conversations
    Normal,
    /// Unclassified batches
    Default,
}

impl From<WeightArg> for PayloadWeight {
    fn from(arg: WeightArg) -> Self {
        match arg {
            WeightArg::Heavy => PayloadWeight::Heavy,
            WeightArg::Normal => PayloadWeight::Normal,
            WeightArg::Default => PayloadWeight::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_to_default_weight() {
        let cli = Cli::try_parse_from(["colloquy", "run", "--input", "batch.jsonl"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.weight, WeightArg::Default);
        assert_eq!(
            args.limit(),
            ConcurrencyLimit::Weight(PayloadWeight::Default)
        );
        assert!(args.output.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn explicit_concurrency_overrides_weight() {
        let cli = Cli::try_parse_from([
            "colloquy",
            "run",
            "-i",
            "batch.jsonl",
            "--weight",
            "heavy",
            "--concurrency",
            "7",
            "-v",
            "--json-logs",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.limit(), ConcurrencyLimit::Fixed(7));
        assert!(cli.verbose);
        assert!(cli.json_logs);
    }

    #[test]
    fn run_requires_input() {
        assert!(Cli::try_parse_from(["colloquy", "run"]).is_err());
    }

    #[test]
    fn models_accepts_config() {
        let cli = Cli::try_parse_from(["colloquy", "models", "--config", "c.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Models { config: Some(_) }
        ));
    }
}

//! CLI argument definitions.

use crate::enrich::MalformedPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "triage",
    version,
    about = "Classify UI test failures and assign triage priorities"
)]
pub struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra settings file applied on top of global and project settings
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enrich a JSONL file of failure records
    Enrich(EnrichArgs),
    /// Classify a single failure from --text or a JSON record on stdin
    Classify(ClassifyArgs),
    /// Summarize an enriched JSONL file
    Summary(SummaryArgs),
    /// Check an enriched JSONL file for structural problems
    Validate(ValidateArgs),
    /// Show settings paths and the effective configuration
    Config,
}

#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// Input JSONL file
    #[arg(long, short)]
    pub input: PathBuf,

    /// Output JSONL file (default: <input stem>.enriched.jsonl next to the input)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write malformed-line reports here as JSONL
    #[arg(long)]
    pub errors: Option<PathBuf>,

    /// Malformed-line handling (overrides settings)
    #[arg(long, value_enum)]
    pub on_malformed: Option<MalformedArg>,

    /// Enrich records across all cores
    #[arg(long)]
    pub parallel: bool,
}

impl EnrichArgs {
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map_or_else(|| "input".to_string(), |s| s.to_string_lossy().into_owned());
        self.input.with_file_name(format!("{stem}.enriched.jsonl"))
    }
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Free-form failure text; reads a JSON record from stdin when omitted
    #[arg(long, short)]
    pub text: Option<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Enriched JSONL file
    #[arg(long, short)]
    pub input: PathBuf,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Enriched JSONL file
    #[arg(long, short)]
    pub input: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MalformedArg {
    Collect,
    Abort,
}

impl From<MalformedArg> for MalformedPolicy {
    fn from(value: MalformedArg) -> Self {
        match value {
            MalformedArg::Collect => Self::Collect,
            MalformedArg::Abort => Self::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_output_sits_next_to_input() {
        let cli = Cli::parse_from(["triage", "enrich", "--input", "runs/results.jsonl"]);
        let Commands::Enrich(args) = cli.command else {
            panic!("expected enrich");
        };
        assert_eq!(
            args.output_path(),
            PathBuf::from("runs/results.enriched.jsonl")
        );
        assert!(!args.parallel);
        assert!(args.on_malformed.is_none());
    }

    #[test]
    fn enrich_flags_parse() {
        let cli = Cli::parse_from([
            "triage",
            "-v",
            "enrich",
            "-i",
            "in.jsonl",
            "-o",
            "out.jsonl",
            "--on-malformed",
            "abort",
            "--parallel",
            "--config",
            "custom.json",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
        let Commands::Enrich(args) = cli.command else {
            panic!("expected enrich");
        };
        assert_eq!(args.output_path(), PathBuf::from("out.jsonl"));
        assert_eq!(
            args.on_malformed.map(MalformedPolicy::from),
            Some(MalformedPolicy::Abort)
        );
        assert!(args.parallel);
    }

    #[test]
    fn classify_text_is_optional() {
        let cli = Cli::parse_from(["triage", "classify"]);
        assert!(matches!(cli.command, Commands::Classify(ClassifyArgs { text: None })));
    }
}

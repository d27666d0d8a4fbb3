//! triage - classify UI test failures and assign triage priorities.

#![forbid(unsafe_code)]

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use triage::cli::{ClassifyArgs, Cli, Commands, EnrichArgs, SummaryArgs, ValidateArgs};
use triage::config::{CONFIG_PATH_ENV, Config};
use triage::enrich::format_timestamp;
use triage::jsonl::{parse_all, read_input, write_jsonl};
use triage::record::FailureRecord;
use triage::summary::{SummaryRow, TriageSummary};
use triage::validate::validate_records;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Enrich(args) => run_enrich(&args, explicit),
        Commands::Classify(args) => run_classify(&args, explicit),
        Commands::Summary(args) => run_summary(&args),
        Commands::Validate(args) => run_validate(&args),
        Commands::Config => handle_config(explicit),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    Config::load_with(explicit).context("failed to load settings")
}

fn run_enrich(args: &EnrichArgs, explicit: Option<&Path>) -> Result<()> {
    let mut config = load_config(explicit)?;
    if let Some(policy) = args.on_malformed {
        config.enrich.on_malformed = policy.into();
    }
    config.enrich.parallel |= args.parallel;
    let enricher = config.build_enricher()?;

    let text = read_input(&args.input)?;
    let batch = enricher
        .enrich_jsonl(&text)
        .with_context(|| format!("failed to enrich {}", args.input.display()))?;

    let output = args.output_path();
    write_jsonl(&output, &batch.records)
        .with_context(|| format!("failed to write {}", output.display()))?;
    if let Some(errors_path) = &args.errors {
        write_jsonl(errors_path, &batch.errors)
            .with_context(|| format!("failed to write {}", errors_path.display()))?;
    }

    println!(
        "Enriched {} of {} records -> {}",
        batch.records.len(),
        batch.input_count(),
        output.display()
    );
    if !batch.is_clean() {
        eprintln!("Skipped {} malformed line(s)", batch.errors.len());
        for error in &batch.errors {
            eprintln!("  line {}: {}", error.line, error.message);
        }
    }
    Ok(())
}

fn run_classify(args: &ClassifyArgs, explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    let enricher = config.build_enricher()?;

    if let Some(text) = &args.text {
        let (classification, decision) = enricher.classify_text(text);
        return print_json(
            &json!({
                "predicted_category": classification.category,
                "confidence": classification.confidence,
                "explainability": classification.explanation,
                "source": classification.source,
                "triage_priority": decision.priority,
                "priority_reason": decision.reason.describe(),
            }),
        );
    }

    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read record from stdin")?;
    if raw.trim().is_empty() {
        bail!("expected --text or a JSON failure record on stdin");
    }
    let record = FailureRecord::from_json(raw.trim()).context("invalid failure record")?;
    let enriched = enricher.enrich_record(&record, &format_timestamp(Utc::now()));
    print_json(&enriched)
}

fn run_summary(args: &SummaryArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let rows: Vec<SummaryRow> =
        parse_all(&text).with_context(|| format!("failed to read {}", args.input.display()))?;
    let summary = TriageSummary::from_rows(&rows);
    if args.json {
        print_json(&summary)
    } else {
        print!("{}", summary.render());
        Ok(())
    }
}

fn run_validate(args: &ValidateArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let records: Vec<Value> =
        parse_all(&text).with_context(|| format!("failed to read {}", args.input.display()))?;
    let report = validate_records(&records);
    print_json(&report)?;
    if !report.is_valid() {
        bail!(
            "{} failed validation ({} issues)",
            args.input.display(),
            report.issues.len()
        );
    }
    Ok(())
}

fn handle_config(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let global_path = Config::global_path();
    let project_path = Config::project_path(&cwd);

    println!("Settings paths:");
    println!("  Global:  {} (override with {CONFIG_PATH_ENV})", global_path.display());
    println!("  Project: {}", project_path.display());
    if let Some(path) = explicit {
        println!("  Explicit: {}", path.display());
    }
    println!();
    println!("Settings precedence:");
    println!("  1) CLI flags");
    println!("  2) --config file");
    println!("  3) Project settings ({})", project_path.display());
    println!("  4) Global settings ({})", global_path.display());
    println!("  5) Built-in defaults");
    println!();
    println!("Effective settings:");
    print_json(&config)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("failed to serialize JSON output")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    Ok(())
}

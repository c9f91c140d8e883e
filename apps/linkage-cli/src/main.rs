//! im-linkage - duplicate detection for person records
//!
//! # Usage
//!
//! ```bash
//! # Score, classify and cluster a CSV of person records
//! im-linkage run people.csv --pairs pairs.csv --clusters clusters.csv
//!
//! # Same, with a config file and an evaluation against labelled groups
//! im-linkage run people.csv --config linkage.toml --evaluate
//!
//! # Inspect normalized records
//! im-linkage normalize people.csv
//!
//! # Compare a pairs table with known duplicates
//! im-linkage evaluate pairs.csv truth.csv
//!
//! # Print the default configuration
//! im-linkage config > linkage.toml
//! ```

mod io;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use im_linkage::{
    evaluate, normalize_batch, truth_pairs_from_records, BlockingStrategy, DetectorConfig,
    DuplicateDetector, EvaluationReport,
};

use crate::io::{
    read_duplicate_pairs, read_records, read_truth_pairs, write_rows, write_rows_to, CliResult,
};

/// Duplicate detection for person records
#[derive(Parser)]
#[command(name = "im-linkage", version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect duplicates and write the pairs and clusters tables
    Run {
        /// Input CSV of person records
        input: PathBuf,

        /// Configuration file (TOML, or JSON with a .json extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the pair score threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Override the blocking strategy
        #[arg(short, long)]
        strategy: Option<String>,

        /// Pairs table output
        #[arg(long, default_value = "pairs.csv")]
        pairs: PathBuf,

        /// Clusters table output
        #[arg(long, default_value = "clusters.csv")]
        clusters: PathBuf,

        /// Evaluate against an `id1,id2` CSV of true pairs
        #[arg(long, conflicts_with = "evaluate")]
        truth: Option<PathBuf>,

        /// Evaluate against the input's `duplicate_group` labels
        #[arg(long)]
        evaluate: bool,
    },

    /// Write normalized records as CSV to stdout or a file
    Normalize {
        /// Input CSV of person records
        input: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare a pairs table with an `id1,id2` CSV of true pairs
    Evaluate {
        /// Pairs table written by `run`
        pairs: PathBuf,

        /// CSV of true duplicate pairs
        truth: PathBuf,
    },

    /// Print the default configuration as TOML
    Config,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(
    path: Option<PathBuf>,
    threshold: Option<f64>,
    strategy: Option<String>,
) -> CliResult<DetectorConfig> {
    let mut config = match path {
        Some(path) => DetectorConfig::from_path(&path)?,
        None => DetectorConfig::default(),
    };
    if let Some(threshold) = threshold {
        config = config.with_threshold(threshold);
    }
    if let Some(name) = strategy {
        config = config.with_strategy(BlockingStrategy::from_name(&name));
    }
    Ok(config)
}

fn print_report(report: &EvaluationReport) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run(
    input: PathBuf,
    config: Option<PathBuf>,
    threshold: Option<f64>,
    strategy: Option<String>,
    pairs: PathBuf,
    clusters: PathBuf,
    truth: Option<PathBuf>,
    evaluate_groups: bool,
) -> CliResult<()> {
    let config = load_config(config, threshold, strategy)?;
    let detector = DuplicateDetector::new(config)?;

    let records = read_records(&input)?;
    let result = detector.run(&records)?;

    write_rows_to(&pairs, &result.pair_rows())?;
    write_rows_to(&clusters, &result.cluster_rows())?;
    info!(
        "Wrote {} pairs to {} and {} cluster rows to {}",
        result.pairs.len(),
        pairs.display(),
        result.record_count(),
        clusters.display()
    );

    let truth = match truth {
        Some(path) => Some(read_truth_pairs(&path)?),
        None if evaluate_groups => Some(truth_pairs_from_records(&records)),
        None => None,
    };
    if let Some(truth) = truth {
        print_report(&result.evaluate(truth))?;
    }
    Ok(())
}

fn normalize(input: PathBuf, output: Option<PathBuf>) -> CliResult<()> {
    let records = normalize_batch(&read_records(&input)?)?;
    match output {
        Some(path) => write_rows_to(&path, &records),
        None => write_rows(std::io::stdout().lock(), &records),
    }
}

fn evaluate_tables(pairs: PathBuf, truth: PathBuf) -> CliResult<()> {
    let predicted = read_duplicate_pairs(&pairs)?;
    let truth = read_truth_pairs(&truth)?;
    print_report(&evaluate(predicted, truth))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            threshold,
            strategy,
            pairs,
            clusters,
            truth,
            evaluate,
        } => run(
            input, config, threshold, strategy, pairs, clusters, truth, evaluate,
        ),
        Commands::Normalize { input, output } => normalize(input, output),
        Commands::Evaluate { pairs, truth } => evaluate_tables(pairs, truth),
        Commands::Config => DetectorConfig::default()
            .to_toml()
            .map(|toml| print!("{}", toml))
            .map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

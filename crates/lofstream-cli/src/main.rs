#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
//! `lofstream` CLI - incremental LOF scoring of files
//!
//! Usage:
//!   `lofstream score ./points.csv -k 10`
//!   `lofstream score ./points.jsonl --format json --top 20`
//!   `lofstream config init --output lofstream.toml`

mod import;
mod output;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lofstream_core::{DistanceMetric, LofBatch, LofConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::import::InputFormat;

#[derive(Parser)]
#[command(name = "lofstream")]
#[command(
    author,
    version,
    about = "lofstream CLI - Incremental Local Outlier Factor scoring"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// CLI metric option
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MetricArg {
    Euclidean,
    Manhattan,
    Chebyshev,
    Minkowski,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every record of a CSV or JSONL file
    Score(ScoreArgs),

    /// Create or check configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct ScoreArgs {
    /// Path to data file (CSV or JSONL)
    file: PathBuf,

    /// Configuration file (default: ./lofstream.toml if present)
    #[arg(short, long, env = "LOFSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Neighborhood size
    #[arg(short)]
    k: Option<usize>,

    /// Distance metric
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    /// Exponent of the Minkowski metric (implies --metric minkowski)
    #[arg(long)]
    p: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Only print the N highest scores, descending
    #[arg(long)]
    top: Option<usize>,

    /// CSV field delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Check every table invariant after scoring
    #[arg(long)]
    verify: bool,

    /// Show progress bar
    #[arg(long)]
    progress: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Parse and validate a configuration file
    Validate {
        /// Configuration file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score(args) => run_score(&args, cli.verbose)?,
        Commands::Config { action } => match action {
            ConfigAction::Init { output, force } => config_init(output.as_deref(), force)?,
            ConfigAction::Validate { file } => config_validate(&file)?,
        },
    }

    Ok(())
}

fn run_score(args: &ScoreArgs, verbose: u8) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => LofConfig::load_existing(path)?,
        None => LofConfig::load()?,
    };
    if let Some(k) = args.k {
        config.lof.k = k;
    }
    if let Some(metric) = resolve_metric(args.metric, args.p)? {
        config.distance = metric;
    }
    match verbose {
        0 => {}
        1 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }
    config.validate()?;
    init_tracing(&config.logging.level, &config.logging.format);

    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .context("Delimiter must be a single ASCII character")?;
    let records = import::load_records(&args.file, InputFormat::detect(&args.file), delimiter)?;
    info!(
        records = records.len(),
        file = %args.file.display(),
        "loaded input"
    );

    let mut batch = LofBatch::from_config(&config)?;
    let progress = create_progress_bar(records.len(), args.progress);
    let start = std::time::Instant::now();
    for record in &records {
        batch
            .push(record.vector.clone())
            .with_context(|| format!("Failed to score record on line {}", record.line))?;
        progress.inc(1);
    }
    progress.finish_and_clear();
    let elapsed = start.elapsed();

    if args.verify {
        batch.engine().verify().context("Consistency check failed")?;
        info!("consistency check passed");
    }

    let scores = batch.scores()?;
    let rows = output::rank(&records, &scores, args.top);

    match args.format {
        OutputFormat::Json => output::write_json(std::io::stdout().lock(), &rows)?,
        OutputFormat::Csv => output::write_csv(std::io::stdout().lock(), &rows)?,
        OutputFormat::Table => {
            println!("{}", output::render_table(&rows));

            let stats = batch.stats();
            println!("\n{}", "Scoring Summary".green().bold());
            println!("  Records:          {}", stats.inserted);
            println!(
                "  k / metric:       {} / {}",
                config.lof.k,
                config.distance.as_str()
            );
            println!("  Evictions:        {}", stats.evictions);
            println!("  Reach updates:    {}", stats.reachability_updates);
            println!("  Duration:         {} ms", elapsed.as_millis());
            if args.verify {
                println!("  Consistency:      {}", "verified".green());
            }
        }
    }

    Ok(())
}

fn resolve_metric(metric: Option<MetricArg>, p: Option<u32>) -> Result<Option<DistanceMetric>> {
    let resolved = match (metric, p) {
        (None, None) => None,
        (None | Some(MetricArg::Minkowski), Some(p)) => Some(DistanceMetric::Minkowski { p }),
        (Some(MetricArg::Minkowski), None) => bail!("--metric minkowski requires --p"),
        (Some(_), Some(_)) => bail!("--p only applies to --metric minkowski"),
        (Some(MetricArg::Euclidean), None) => Some(DistanceMetric::Euclidean),
        (Some(MetricArg::Manhattan), None) => Some(DistanceMetric::Manhattan),
        (Some(MetricArg::Chebyshev), None) => Some(DistanceMetric::Chebyshev),
    };
    Ok(resolved)
}

fn config_init(output: Option<&Path>, force: bool) -> Result<()> {
    let config = LofConfig::default();
    match output {
        None => print!("{}", config.to_toml()?),
        Some(path) => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            config.save(path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
    }
    Ok(())
}

fn config_validate(path: &Path) -> Result<()> {
    let config = LofConfig::load_existing(path)?;
    config
        .validate()
        .with_context(|| format!("{} is invalid", path.display()))?;

    println!("{} {}", "Valid:".green().bold(), path.display());
    println!("  k:        {}", config.lof.k);
    println!("  metric:   {:?}", config.distance);
    println!(
        "  logging:  {} ({})",
        config.logging.level, config.logging.format
    );
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable; `RUST_LOG` wins over
/// the configured level.
fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(err) = result {
        eprintln!("warning: logging not initialized: {err}");
    }
}

/// Create progress bar
fn create_progress_bar(total: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

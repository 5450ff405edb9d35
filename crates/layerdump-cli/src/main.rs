//! Command-line interface for `layerdump`, which downloads the feature layers of a
//! map service and converts each one to a CSV file.
//!
//! This binary provides a thin CLI over the [`layerdump_core`] library: it parses
//! arguments, loads the run configuration, configures logging, and delegates to
//! command handlers.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! Library crates log through the `log` facade, which is bridged into `tracing` at startup.
//!
//! # Available Commands
//!
//! - `run` - Fetch every selected layer, then convert the payloads to CSV
//! - `fetch` - Fetch every selected layer without converting
//! - `convert` - Convert the JSON payloads already in a directory
//! - `layers` - Show the layers a layer expression selects
//! - `schema` - Show the field schema of a downloaded layer payload
//! - `types` - List the declared field types and how they are rendered

mod display;

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use tracing::{Level, error, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use layerdump_core::config::{CSV_SUBDIRECTORY, DEFAULT_CONFIG_PATH, LOG_FILE_NAME};
use layerdump_core::error::IoErrorExt;
use layerdump_core::operations;
use layerdump_core::selector::{resolve_layer_spec, select_layers};
use layerdump_core::{AppConfig, HttpLayerSource, LayerdumpError};
use layerdump_esrijson::{extract_schema, parse_payload};

use crate::display::{
    display_convert_report, display_fetch_report, display_layers, display_schema, display_types,
};

#[derive(Parser)]
#[command(
    name = "layerdump",
    version,
    about = "Download map-service layers and convert them to CSV",
    long_about = "layerdump fetches every selected layer of a map service as raw JSON and\n\
                  converts each payload into a CSV file whose columns follow the layer's field schema."
)]
/// Command-line arguments and options for the `layerdump` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `layerdump` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Fetches every selected layer and converts the payloads to CSV.
    Run {
        /// Path to the configuration file.
        #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Number of layers processed at once (defaults to `max_concurrent_requests`).
        #[arg(short, long, value_name = "N", value_parser = jobs_parser())]
        jobs: Option<usize>,

        /// Start without waiting for enter, even if `prompt_for_run` is set.
        #[arg(short, long)]
        yes: bool,
    },

    /// Fetches every selected layer into the output directory without converting.
    Fetch {
        /// Path to the configuration file.
        #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Number of layers fetched at once (defaults to `max_concurrent_requests`).
        #[arg(short, long, value_name = "N", value_parser = jobs_parser())]
        jobs: Option<usize>,
    },

    /// Converts the JSON payloads in a directory into its `csv` subdirectory.
    Convert {
        /// Path to the configuration file (not needed when `--dir` is given).
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Directory holding the JSON payloads (defaults to `output_directory`).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Number of files converted at once.
        #[arg(short, long, value_name = "N", value_parser = jobs_parser())]
        jobs: Option<usize>,
    },

    /// Lists the layers selected by the configured (or given) layer expression.
    Layers {
        /// Path to the configuration file.
        #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Layer expression to resolve instead of `layer_numbers`, e.g. "0,2-4".
        #[arg(short, long, value_name = "SPEC")]
        spec: Option<String>,
    },

    /// Shows the field schema (names, aliases, types, lengths) of a layer payload.
    Schema {
        /// Raw JSON payload of one layer.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Lists the declared field types and how their values are rendered.
    Types,
}

fn jobs_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

impl Commands {
    /// Configuration file this command reads, if any.
    fn config_path(&self) -> Option<PathBuf> {
        match self {
            Commands::Run { config, .. }
            | Commands::Fetch { config, .. }
            | Commands::Layers { config, .. } => Some(config.clone()),
            Commands::Convert { config, dir, .. } => match (config, dir) {
                (Some(path), _) => Some(path.clone()),
                (None, None) => Some(PathBuf::from(DEFAULT_CONFIG_PATH)),
                (None, Some(_)) => None,
            },
            Commands::Schema { .. } | Commands::Types => None,
        }
    }
}

/// Entry point for the `layerdump` command-line interface.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a run-fatal error occurs,
/// or any layer or file failed.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let config = cli.command.config_path().map(AppConfig::from_path);
    let log_file = config
        .as_ref()
        .and_then(|c| c.as_ref().ok())
        .filter(|c| c.file_logging_enabled)
        .map(|_| PathBuf::from(LOG_FILE_NAME));
    init_logging(log_level, log_file.as_deref())?;

    let config = config
        .transpose()
        .map_err(|e| cli_error(&LayerdumpError::from(e)))?;

    match cli.command {
        Commands::Run { jobs, yes, .. } => handle_run(&required(config)?, jobs, yes).await,
        Commands::Fetch { jobs, .. } => handle_fetch(&required(config)?, jobs).await,
        Commands::Convert { dir, jobs, .. } => handle_convert(config.as_ref(), dir, jobs).await,
        Commands::Layers { spec, .. } => handle_layers(&required(config)?, spec.as_deref()),
        Commands::Schema { file } => handle_schema(&file),
        Commands::Types => {
            display_types();
            Ok(())
        },
    }
}

/// Install the global subscriber, writing to stderr or to a fresh log file.
fn init_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if let Some(path) = log_file {
        // Truncates any log left by a previous run
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file '{}'", path.display()))?;
        let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = builder.with_writer(io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

fn required(config: Option<AppConfig>) -> Result<AppConfig> {
    config.ok_or_else(|| anyhow!("This command requires a configuration file"))
}

/// Turn a library error into a CLI error carrying its recovery hint.
fn cli_error(err: &LayerdumpError) -> anyhow::Error {
    error!("{err}");
    let message = err.user_message();
    match err.recovery_suggestion() {
        Some(hint) => anyhow!("{message}\nHint: {hint}"),
        None => anyhow!(message),
    }
}

fn wait_for_enter() -> Result<()> {
    eprint!("Press enter to start...");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

fn failures(count: usize) -> Result<()> {
    if count > 0 {
        bail!("{count} layer(s) or file(s) failed; rerun with --verbose for details");
    }
    Ok(())
}

async fn handle_run(config: &AppConfig, jobs: Option<usize>, yes: bool) -> Result<()> {
    let jobs = jobs.unwrap_or(config.max_concurrent_requests);
    info!("Run command:");
    info!("Service: {}", config.data_url);
    info!("Output: {}", config.output_directory.display());

    if config.prompt_for_run && !yes {
        wait_for_enter()?;
    }

    let source =
        HttpLayerSource::from_config(config).map_err(|e| cli_error(&LayerdumpError::from(e)))?;
    let report = operations::run(config, &source, jobs)
        .await
        .map_err(|e| cli_error(&e))?;

    display_fetch_report(&report.fetch);
    display_convert_report(&report.convert);
    failures(report.failure_count())
}

async fn handle_fetch(config: &AppConfig, jobs: Option<usize>) -> Result<()> {
    let jobs = jobs.unwrap_or(config.max_concurrent_requests);
    info!("Fetch command:");

    let layers = select_layers(config).map_err(|e| cli_error(&LayerdumpError::from(e)))?;
    operations::create_output_directory(&config.output_directory).map_err(|e| cli_error(&e))?;
    let source =
        HttpLayerSource::from_config(config).map_err(|e| cli_error(&LayerdumpError::from(e)))?;

    let report = operations::fetch_layers(&source, &layers, &config.output_directory, jobs).await;

    display_fetch_report(&report);
    failures(report.failed())
}

async fn handle_convert(
    config: Option<&AppConfig>,
    dir: Option<PathBuf>,
    jobs: Option<usize>,
) -> Result<()> {
    let json_dir = dir
        .or_else(|| config.map(|c| c.output_directory.clone()))
        .ok_or_else(|| anyhow!("No input directory: pass --dir or a configuration file"))?;
    let jobs = jobs
        .or_else(|| config.map(|c| c.max_concurrent_requests))
        .unwrap_or(1);
    let csv_dir = json_dir.join(CSV_SUBDIRECTORY);
    let options = config.map(AppConfig::csv_writer_options).unwrap_or_default();

    info!("Convert command:");
    info!("Input: {}", json_dir.display());
    info!("Output: {}", csv_dir.display());

    let report =
        operations::convert_directory(&json_dir, &csv_dir, &options, jobs)
            .await
            .map_err(|e| cli_error(&e))?;

    display_convert_report(&report);
    failures(report.failed())
}

fn handle_layers(config: &AppConfig, spec: Option<&str>) -> Result<()> {
    let spec = spec.unwrap_or(&config.layer_numbers);
    info!("Resolving layer expression '{spec}'");

    let layers = resolve_layer_spec(spec, &config.layer_names)
        .map_err(|e| cli_error(&LayerdumpError::from(e)))?;

    display_layers(&layers);
    Ok(())
}

fn handle_schema(file: &Path) -> Result<()> {
    info!("Reading schema of {}", file.display());

    let bytes = std::fs::read(file)
        .with_read_context("JSON", file)
        .map_err(|e| cli_error(&e))?;
    let context = file.display().to_string();
    let schema = parse_payload(&bytes, &context)
        .and_then(|payload| extract_schema(&payload, &context))
        .map_err(|e| cli_error(&LayerdumpError::from(e)))?;

    display_schema(file, &schema);
    Ok(())
}

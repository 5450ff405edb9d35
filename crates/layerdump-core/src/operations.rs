//! Core download and conversion operations.
//!
//! A run has two stages:
//!
//! 1. **Fetch**: every selected layer is requested from a [`LayerSource`] and
//!    its payload written verbatim to `{output_directory}/{name}.json`.
//! 2. **Convert**: every `*.json` file in the output directory is converted to
//!    `{output_directory}/csv/{stem}.csv`.
//!
//! Layers and files are independent. Up to `concurrency` of them are
//! processed at once, each writing only its own file, and reports are always
//! returned in input order. A failure is logged and recorded against its
//! layer or file; it never stops the others.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use layerdump_csv::{CsvWriterOptions, write_csv_file};
use layerdump_esrijson::parse_layer_bytes;
use log::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{IoError, IoErrorExt, LayerdumpError, Result};
use crate::fetch::LayerSource;
use crate::selector::select_layers;
use crate::types::{
    ConvertOutcome, ConvertReport, ConvertedTable, FetchOutcome, FetchReport, LayerRef, RunReport,
};

/// Create the output directory if it does not exist yet.
///
/// # Errors
///
/// Returns [`IoError::Directory`] if the directory cannot be created.
pub fn create_output_directory(dir: &Path) -> Result<()> {
    info!("Creating output directory {}", dir.display());
    fs::create_dir_all(dir).map_err(|source| {
        IoError::Directory {
            path: dir.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Fetch every layer and write its raw payload into `output_dir`.
///
/// Failures are logged and recorded per layer.
pub async fn fetch_layers<S>(
    source: &S,
    layers: &[LayerRef],
    output_dir: &Path,
    concurrency: usize,
) -> FetchReport
where
    S: LayerSource + ?Sized,
{
    info!(
        "Fetching {} layer(s) with concurrency {}",
        layers.len(),
        concurrency.max(1)
    );

    let outcomes = stream::iter(layers)
        .map(|layer| fetch_one(source, layer, output_dir))
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    FetchReport { outcomes }
}

async fn fetch_one<S>(source: &S, layer: &LayerRef, output_dir: &Path) -> FetchOutcome
where
    S: LayerSource + ?Sized,
{
    let path = output_dir.join(layer.raw_file_name());
    info!(
        "Requesting layer {} ({}) from {}",
        layer.id,
        layer.name,
        source.describe(layer.id)
    );

    let result = async {
        let payload = source.fetch_layer(layer.id).await?;
        tokio::fs::write(&path, &payload)
            .await
            .with_write_context("JSON", &path)?;
        Ok::<_, LayerdumpError>(payload.len() as u64)
    }
    .await;

    match &result {
        Ok(bytes) => info!(
            "Layer {} written to {} ({bytes} bytes)",
            layer.id,
            path.display()
        ),
        Err(e) => error!("Layer {} ({}) skipped: {e}", layer.id, layer.name),
    }

    FetchOutcome {
        layer: layer.clone(),
        path,
        result,
    }
}

/// Path of the CSV file produced for a JSON payload file.
#[must_use]
pub fn csv_target_path(json_path: &Path, csv_dir: &Path) -> PathBuf {
    let mut file_name = json_path
        .file_stem()
        .unwrap_or(json_path.as_os_str())
        .to_os_string();
    file_name.push(".csv");
    csv_dir.join(file_name)
}

/// List the `*.json` files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns [`IoError::Directory`] if the directory cannot be listed.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir_error = |source| {
        LayerdumpError::from(IoError::Directory {
            path: dir.to_path_buf(),
            source,
        })
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if path.is_file() && is_json {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// Remove and recreate the CSV directory so no stale outputs survive.
///
/// # Errors
///
/// Returns [`IoError::Directory`] if the directory cannot be removed or created.
pub fn reset_csv_directory(csv_dir: &Path) -> Result<()> {
    let dir_error = |source| {
        LayerdumpError::from(IoError::Directory {
            path: csv_dir.to_path_buf(),
            source,
        })
    };

    match fs::remove_dir_all(csv_dir) {
        Ok(()) => debug!("Removed previous CSV directory {}", csv_dir.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {},
        Err(e) => return Err(dir_error(e)),
    }
    fs::create_dir_all(csv_dir).map_err(dir_error)
}

/// Convert one raw JSON payload file into a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has no usable schema, or the
/// CSV file cannot be written. No partial CSV file is left behind.
pub fn convert_file(
    json_path: &Path,
    csv_path: &Path,
    options: &CsvWriterOptions,
) -> Result<ConvertedTable> {
    info!("Converting file: {}", json_path.display());

    let bytes = fs::read(json_path).with_read_context("JSON", json_path)?;
    let table = parse_layer_bytes(&bytes, json_path.display().to_string())?;
    write_csv_file(csv_path, &table.header(), &table.rows, options)?;

    Ok(ConvertedTable {
        fields: table.schema.len(),
        rows: table.rows.len(),
        truncated: table.exceeded_transfer_limit,
    })
}

/// Convert every `*.json` file in `json_dir` into `csv_dir`.
///
/// The CSV directory is recreated first. Per-file failures are logged and
/// recorded in the report.
///
/// # Errors
///
/// Returns an error only if the CSV directory cannot be prepared or
/// `json_dir` cannot be listed.
pub async fn convert_directory(
    json_dir: &Path,
    csv_dir: &Path,
    options: &CsvWriterOptions,
    concurrency: usize,
) -> Result<ConvertReport> {
    info!("Output CSV to directory: {}", csv_dir.display());
    reset_csv_directory(csv_dir)?;
    let files = list_json_files(json_dir)?;
    info!(
        "Converting {} JSON file(s) with concurrency {}",
        files.len(),
        concurrency.max(1)
    );

    let outcomes = stream::iter(files)
        .map(|source| {
            let target = csv_target_path(&source, csv_dir);
            let options = options.clone();
            async move {
                let task_source = source.clone();
                let task_target = target.clone();
                let result = tokio::task::spawn_blocking(move || {
                    convert_file(&task_source, &task_target, &options)
                })
                .await
                .unwrap_or_else(|e| {
                    Err(IoError::Task {
                        path: source.clone(),
                        message: e.to_string(),
                    }
                    .into())
                });
                log_conversion(&source, &target, &result);
                ConvertOutcome {
                    source,
                    target,
                    result,
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(ConvertReport { outcomes })
}

fn log_conversion(source: &Path, target: &Path, result: &Result<ConvertedTable>) {
    match result {
        Ok(table) if table.truncated => warn!(
            "{} converted to {} but the service truncated the result ({} rows)",
            source.display(),
            target.display(),
            table.rows
        ),
        Ok(table) => info!(
            "{} converted to {} ({} fields, {} rows)",
            source.display(),
            target.display(),
            table.fields,
            table.rows
        ),
        Err(e) => error!("Error converting {} to CSV: {e}", source.display()),
    }
}

/// Run the full pipeline: select layers, fetch them, convert the results.
///
/// # Errors
///
/// Returns an error only for run-fatal problems: a malformed layer
/// expression, missing display names, or an output directory that cannot be
/// prepared. Per-layer and per-file failures are reported in the
/// [`RunReport`].
pub async fn run<S>(config: &AppConfig, source: &S, concurrency: usize) -> Result<RunReport>
where
    S: LayerSource + ?Sized,
{
    let layers = select_layers(config)?;
    info!("Selected {} layer(s)", layers.len());

    create_output_directory(&config.output_directory)?;

    let fetch = fetch_layers(source, &layers, &config.output_directory, concurrency).await;
    let convert = convert_directory(
        &config.output_directory,
        &config.csv_directory(),
        &config.csv_writer_options(),
        concurrency,
    )
    .await?;

    let report = RunReport { fetch, convert };
    info!(
        "Run finished: {} layer(s) fetched, {} file(s) converted, {} failure(s)",
        report.fetch.succeeded(),
        report.convert.succeeded(),
        report.failure_count()
    );
    Ok(report)
}

//! Data types for layer download and conversion runs.
//!
//! This module defines the selected-layer descriptor and the reports returned
//! by each stage of a run.

use std::path::PathBuf;

use crate::error::LayerdumpError;

/// A selected layer: its numeric ID and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    /// Layer ID on the map service
    pub id: u32,
    /// Display name, used to name output files
    pub name: String,
}

impl LayerRef {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// File name of the raw payload, e.g. `Roads.json`.
    #[must_use]
    pub fn raw_file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

/// Outcome of fetching one layer.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The layer that was fetched
    pub layer: LayerRef,
    /// Where the raw payload is written
    pub path: PathBuf,
    /// Payload size in bytes, or the error that skipped this layer
    pub result: Result<u64, LayerdumpError>,
}

/// Result of the fetch stage, in layer order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Summary of a successfully converted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedTable {
    /// Number of columns (schema fields)
    pub fields: usize,
    /// Number of data rows written, excluding the header
    pub rows: usize,
    /// Whether the service reported a truncated result set
    pub truncated: bool,
}

/// Outcome of converting one JSON file.
#[derive(Debug)]
pub struct ConvertOutcome {
    /// The raw JSON payload file
    pub source: PathBuf,
    /// The CSV file written for it
    pub target: PathBuf,
    /// Table summary, or the error that skipped this file
    pub result: Result<ConvertedTable, LayerdumpError>,
}

/// Result of the conversion stage, in file-name order.
#[derive(Debug, Default)]
pub struct ConvertReport {
    pub outcomes: Vec<ConvertOutcome>,
}

impl ConvertReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Result of a full fetch-then-convert run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub fetch: FetchReport,
    pub convert: ConvertReport,
}

impl RunReport {
    /// Number of layers and files that failed across both stages.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.fetch.failed() + self.convert.failed()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

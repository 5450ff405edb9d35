//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting layers, field schemas, field types and run reports in a
//! human-readable format.

use std::path::Path;

use tabled::{Table, Tabled};

use layerdump_core::types::{ConvertReport, FetchReport, LayerRef};
use layerdump_esrijson::{DeclaredType, FieldSchema};

/// Table row representation for displaying a selected layer.
#[derive(Tabled)]
pub struct LayerRow {
    /// Layer ID on the map service.
    #[tabled(rename = "ID")]
    pub id: u32,
    /// Display name of the layer.
    #[tabled(rename = "Name")]
    pub name: String,
    /// File name the raw payload is written to.
    #[tabled(rename = "File")]
    pub file: String,
}

/// Table row representation for displaying one field of a layer schema.
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub name: String,
    #[tabled(rename = "Alias")]
    pub alias: String,
    #[tabled(rename = "Type")]
    pub declared_type: String,
    #[tabled(rename = "Class")]
    pub class: String,
    #[tabled(rename = "Length")]
    pub length: String,
}

/// Table row representation for displaying a declared field type.
#[derive(Tabled)]
pub struct TypeRow {
    #[tabled(rename = "Esri Type")]
    pub esri_name: String,
    #[tabled(rename = "Declared Type")]
    pub declared_type: String,
    #[tabled(rename = "Class")]
    pub class: String,
}

/// Table row representation for one fetched layer.
#[derive(Tabled)]
pub struct FetchRow {
    #[tabled(rename = "ID")]
    pub id: u32,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Result")]
    pub result: String,
}

/// Table row representation for one converted file.
#[derive(Tabled)]
pub struct ConvertRow {
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Fields")]
    pub fields: String,
    #[tabled(rename = "Rows")]
    pub rows: String,
    #[tabled(rename = "Result")]
    pub result: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[must_use]
pub fn layer_rows(layers: &[LayerRef]) -> Vec<LayerRow> {
    layers
        .iter()
        .map(|layer| LayerRow {
            id: layer.id,
            name: layer.name.clone(),
            file: layer.raw_file_name(),
        })
        .collect()
}

#[must_use]
pub fn field_rows(schema: &FieldSchema) -> Vec<FieldRow> {
    schema
        .iter()
        .map(|field| FieldRow {
            name: field.name.clone(),
            alias: field.alias.clone().unwrap_or_default(),
            declared_type: field.declared_type.to_string(),
            class: field.declared_type.value_class().as_str().to_string(),
            length: field
                .length
                .map_or_else(|| "N/A".to_string(), |length| length.to_string()),
        })
        .collect()
}

#[must_use]
pub fn type_rows() -> Vec<TypeRow> {
    DeclaredType::ALL
        .iter()
        .map(|ty| TypeRow {
            esri_name: ty.esri_name().unwrap_or("(any other)").to_string(),
            declared_type: ty.as_str().to_string(),
            class: ty.value_class().as_str().to_string(),
        })
        .collect()
}

#[must_use]
pub fn fetch_rows(report: &FetchReport) -> Vec<FetchRow> {
    report
        .outcomes
        .iter()
        .map(|outcome| FetchRow {
            id: outcome.layer.id,
            name: outcome.layer.name.clone(),
            file: file_name(&outcome.path),
            result: match &outcome.result {
                Ok(bytes) => format!("OK ({bytes} bytes)"),
                Err(e) => e.user_message(),
            },
        })
        .collect()
}

#[must_use]
pub fn convert_rows(report: &ConvertReport) -> Vec<ConvertRow> {
    report
        .outcomes
        .iter()
        .map(|outcome| {
            let (fields, rows, result) = match &outcome.result {
                Ok(table) => (
                    table.fields.to_string(),
                    table.rows.to_string(),
                    if table.truncated {
                        "OK (truncated by service)".to_string()
                    } else {
                        "OK".to_string()
                    },
                ),
                Err(e) => ("-".to_string(), "-".to_string(), e.user_message()),
            };
            ConvertRow {
                source: file_name(&outcome.source),
                target: file_name(&outcome.target),
                fields,
                rows,
                result,
            }
        })
        .collect()
}

/// Print the resolved layer table to standard output.
pub fn display_layers(layers: &[LayerRef]) {
    println!("\nSelected Layers ({} total):\n", layers.len());
    println!("{}", Table::new(layer_rows(layers)));
}

/// Print the field schema of one layer payload.
pub fn display_schema(source: &Path, schema: &FieldSchema) {
    println!(
        "\nSchema of {} ({} field(s)):\n",
        file_name(source),
        schema.len()
    );
    if !schema.is_empty() {
        println!("{}", Table::new(field_rows(schema)));
    }
}

/// Print the declared-type registry to standard output.
pub fn display_types() {
    let rows = type_rows();
    println!("\nDeclared Field Types ({} total):\n", rows.len());
    println!("{}", Table::new(rows));
}

/// Print the outcome of the fetch stage.
pub fn display_fetch_report(report: &FetchReport) {
    println!(
        "\n=== Fetch: {} succeeded, {} failed ===",
        report.succeeded(),
        report.failed()
    );
    if !report.outcomes.is_empty() {
        println!("{}", Table::new(fetch_rows(report)));
    }
}

/// Print the outcome of the conversion stage.
pub fn display_convert_report(report: &ConvertReport) {
    println!(
        "\n=== Convert: {} succeeded, {} failed ===",
        report.succeeded(),
        report.failed()
    );
    if !report.outcomes.is_empty() {
        println!("{}", Table::new(convert_rows(report)));
    }
}

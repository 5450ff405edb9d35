use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use layerdump_core::error::{FetchError, LayerdumpError};
use layerdump_core::operations::{convert_directory, run};
use layerdump_core::{AppConfig, LayerSource};
use layerdump_csv::CsvWriterOptions;
use layerdump_shared::LayerFormatError;
use tempfile::TempDir;

const FIXTURES: &str = "tests/e2e_data";

/// Serves fixture files by layer ID.
struct FixtureSource {
    files: HashMap<u32, &'static str>,
}

#[async_trait]
impl LayerSource for FixtureSource {
    async fn fetch_layer(&self, layer_id: u32) -> Result<Bytes, FetchError> {
        let file = self.files.get(&layer_id).ok_or(FetchError::Other {
            layer: layer_id,
            message: "no such layer".to_string(),
        })?;
        let path = Path::new(FIXTURES).join(file);
        fs::read(&path).map(Bytes::from).map_err(|e| FetchError::Other {
            layer: layer_id,
            message: format!("{}: {e}", path.display()),
        })
    }
}

fn copy_fixture(name: &str, dir: &Path) {
    fs::copy(Path::new(FIXTURES).join(name), dir.join(name))
        .unwrap_or_else(|e| panic!("failed to copy {name}: {e}"));
}

fn config_for(out: &Path, layers: &str, names: &str) -> AppConfig {
    let text = format!(
        "data_url = \"http://localhost/MapServer\"\n\
         layer_numbers = \"{layers}\"\n\
         output_directory = '{}'\n\
         layer_names = \"{names}\"\n",
        out.display()
    );
    AppConfig::from_toml_str(&text, "test").unwrap()
}

/// Test converting a directory of fixture payloads
#[tokio::test]
async fn test_convert_fixture_directory() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["sites.json", "survey_points.json", "error_response.json"] {
        copy_fixture(name, temp_dir.path());
    }
    let csv_dir = temp_dir.path().join("csv");

    let report = convert_directory(temp_dir.path(), &csv_dir, &CsvWriterOptions::default(), 2)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.succeeded(), 2);

    assert_eq!(
        fs::read_to_string(csv_dir.join("sites.csv")).unwrap(),
        "OBJECTID,NAME\n1,Site A\n"
    );
    assert_eq!(
        fs::read_to_string(csv_dir.join("survey_points.csv")).unwrap(),
        "OBJECTID,LABEL,ELEVATION,SURVEYED\n1,\"Trig, North\",312.25000,1577836800000\n2,,,\n"
    );

    let survey = report
        .outcomes
        .iter()
        .find(|o| o.source.ends_with("survey_points.json"))
        .unwrap();
    assert!(survey.result.as_ref().unwrap().truncated);

    let failed = &report.outcomes[0];
    assert!(failed.source.ends_with("error_response.json"));
    assert!(matches!(
        failed.result,
        Err(LayerdumpError::Format(LayerFormatError::Service { code: 400, .. }))
    ));
    assert!(!csv_dir.join("error_response.csv").exists());
}

/// Test a whole run against an in-memory source
#[tokio::test]
async fn test_run_with_fixture_source() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("output");
    let config = config_for(&out, "1-3", "Sites,Survey,Broken");
    let source = FixtureSource {
        files: HashMap::from([
            (1, "sites.json"),
            (2, "survey_points.json"),
            (3, "error_response.json"),
        ]),
    };

    let report = run(&config, &source, 3).await.unwrap();

    assert_eq!(report.fetch.succeeded(), 3);
    assert_eq!(report.convert.succeeded(), 2);
    assert_eq!(report.convert.failed(), 1);
    assert_eq!(report.failure_count(), 1);

    assert_eq!(
        fs::read(out.join("Sites.json")).unwrap(),
        fs::read(Path::new(FIXTURES).join("sites.json")).unwrap()
    );
    assert_eq!(
        fs::read_to_string(out.join("csv").join("Sites.csv")).unwrap(),
        "OBJECTID,NAME\n1,Site A\n"
    );
    assert!(out.join("csv").join("Survey.csv").is_file());
    assert!(!out.join("csv").join("Broken.csv").exists());
}

/// Test that a rerun clears CSV files left over from earlier runs
#[tokio::test]
async fn test_rerun_replaces_csv_directory() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("output");
    fs::create_dir_all(out.join("csv")).unwrap();
    fs::write(out.join("csv").join("Stale.csv"), "old").unwrap();

    let config = config_for(&out, "0", "Sites");
    let source = FixtureSource {
        files: HashMap::from([(0, "sites.json")]),
    };

    let report = run(&config, &source, 1).await.unwrap();

    assert!(!report.has_failures());
    assert!(!out.join("csv").join("Stale.csv").exists());
    assert!(out.join("csv").join("Sites.csv").is_file());
}

/// Test that missing display names stop the run before anything is written
#[tokio::test]
async fn test_missing_names_are_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("output");
    let config = config_for(&out, "1-3", "Sites,Survey");
    let source = FixtureSource {
        files: HashMap::new(),
    };

    let err = run(&config, &source, 1).await.unwrap_err();

    assert!(err.is_run_fatal());
    assert!(err.to_string().contains("3 layer(s) selected"));
    assert!(!out.exists());
}

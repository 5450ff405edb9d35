//! Integration tests for CSV writer functionality

use std::fs;

use layerdump_csv::{CsvWriterOptions, write_csv_file, write_csv_to_bytes};
use layerdump_shared::LayerFormatError;
use tempfile::TempDir;

fn tricky_rows() -> Vec<Vec<String>> {
    vec![
        vec!["1".into(), "Main St, North".into(), "He said \"stop\"".into()],
        vec!["2".into(), "first\nsecond".into(), "".into()],
        vec!["3".into(), "\"".into(), "carriage\r\nreturn".into()],
        vec!["4".into(), "plain".into(), "trailing,".into()],
    ]
}

#[test]
fn test_round_trip_through_csv_reader() {
    let header = vec!["ID".to_string(), "STREET".to_string(), "NOTE".to_string()];
    let rows = tricky_rows();

    let bytes = write_csv_to_bytes(&header, &rows, &CsvWriterOptions::default()).unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(bytes.as_slice());
    let parsed: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();

    assert_eq!(parsed[0], header);
    assert_eq!(&parsed[1..], rows.as_slice());
}

#[test]
fn test_write_csv_file_creates_target() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Sites.csv");

    write_csv_file(
        &path,
        &["OBJECTID", "NAME"],
        &[vec!["1", "Site A"]],
        &CsvWriterOptions::default(),
    )
    .unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "OBJECTID,NAME\n1,Site A\n");

    // no temporary files are left next to the target
    let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_write_csv_file_replaces_existing_target() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Roads.csv");
    fs::write(&path, "stale contents\n").unwrap();

    write_csv_file(&path, &["A"], &[vec!["x"]], &CsvWriterOptions::default()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "A\nx\n");
}

#[test]
fn test_write_csv_file_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing").join("Roads.csv");

    let err = write_csv_file(&path, &["A"], &[vec!["x"]], &CsvWriterOptions::default())
        .unwrap_err();

    assert!(matches!(err, LayerFormatError::WriteFailed { .. }));
    assert!(err.to_string().contains("Roads.csv"));
    assert!(!path.exists());
}

#[test]
fn test_failed_write_leaves_previous_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Parcels.csv");
    fs::write(&path, "A,B\n1,2\n").unwrap();

    // mismatched row length aborts before the rename
    let err = write_csv_file(&path, &["A", "B"], &[vec!["1"]], &CsvWriterOptions::default())
        .unwrap_err();

    assert!(matches!(err, LayerFormatError::WriteFailed { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "A,B\n1,2\n");
    let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_csv_writer_options_builder() {
    let options = CsvWriterOptions::new()
        .with_delimiter(b'\t')
        .with_header(false);

    assert_eq!(options.delimiter, b'\t');
    assert!(!options.has_header);
}

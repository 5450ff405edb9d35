use layerdump_esrijson::{DeclaredType, ValueClass, parse_layer_bytes};
use layerdump_shared::LayerFormatError;

const PARKS: &str = "tests/e2e_data/parks.json";

fn read_fixture(path: &str) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

/// Test reading a full map-service query response
#[test]
fn test_read_parks_layer() {
    let table = parse_layer_bytes(&read_fixture(PARKS), PARKS).unwrap();

    assert_eq!(
        table.header(),
        vec![
            "OBJECTID",
            "PARK_NAME",
            "AREA_HA",
            "OPENED",
            "VISITORS",
            "SHAPE",
            "GLOBALID",
            "NOTES"
        ]
    );
    assert_eq!(table.rows.len(), 3);
    for row in &table.rows {
        assert_eq!(row.len(), table.schema.len());
    }
}

/// Test that each declared type is rendered through its class
#[test]
fn test_parks_values_follow_declared_types() {
    let table = parse_layer_bytes(&read_fixture(PARKS), PARKS).unwrap();

    assert_eq!(
        table.rows[0],
        vec![
            "1",
            "Riverside Park",
            "12.50000",
            "1998-06-01",
            "120000",
            "",
            "{6F1B2C3D-0000-4A5B-9C8D-1234567890AB}",
            "Dogs allowed, on leash"
        ]
    );
    assert_eq!(
        table.rows[1],
        vec![
            "2",
            "Hill \"Top\" Reserve",
            "0.33333",
            "",
            "4500",
            "",
            "{00000000-1111-2222-3333-444444444444}",
            "Line one\nLine two"
        ]
    );
    assert_eq!(table.rows[2], vec!["3", "", "", "", "", "", "", ""]);
}

/// Test the schema metadata carried alongside the rows
#[test]
fn test_parks_schema_metadata() {
    let table = parse_layer_bytes(&read_fixture(PARKS), PARKS).unwrap();
    let shape = &table.schema.fields()[5];

    assert_eq!(shape.declared_type, DeclaredType::Geometry);
    assert_eq!(shape.declared_type.value_class(), ValueClass::Opaque);
    assert_eq!(table.schema.fields()[1].length, Some(100));
    assert!(!table.exceeded_transfer_limit);
}

/// Test that a payload lacking a schema is rejected
#[test]
fn test_layer_without_fields() {
    let err = parse_layer_bytes(br#"{"features": [{"attributes": {"A": 1}}]}"#, "broken.json")
        .unwrap_err();
    assert!(err.is_schema_error());
    assert!(err.to_string().contains("broken.json"));
}

/// Test that a non-JSON body is a parse error, not a schema error
#[test]
fn test_html_error_page() {
    let err = parse_layer_bytes(b"<html><body>502 Bad Gateway</body></html>", "gateway.json")
        .unwrap_err();
    assert!(matches!(err, LayerFormatError::Parse { .. }));
    assert!(!err.is_schema_error());
}

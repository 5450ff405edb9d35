//! Projection of feature attributes onto an ordered field schema.
//!
//! Each feature becomes one row with exactly one cell per schema field. A
//! cell is produced by looking the field name up in the feature's
//! `attributes` map and rendering the raw value according to the
//! [`ValueClass`] of the field's declared type:
//!
//! | Class     | Rendering                                              |
//! |-----------|--------------------------------------------------------|
//! | `Text`    | strings verbatim, other scalars as their JSON text     |
//! | `Integer` | base-10 integer, fractional part truncated toward zero |
//! | `Real`    | fixed-point with exactly 5 fractional digits           |
//! | `Opaque`  | always empty                                           |
//!
//! Missing keys and JSON `null` render as the empty string for every class.
//! Real values use Rust's `{:.5}` formatting, which rounds the exact binary
//! value to the nearest representable 5-digit decimal.

use serde_json::{Map, Value};

use crate::types::{DeclaredType, FieldSchema, ValueClass};

/// Number of fractional digits emitted for real-valued fields.
pub const REAL_PRECISION: usize = 5;

/// Renders one raw attribute value for a field of the given declared type.
///
/// The result is always trimmed of leading and trailing whitespace.
#[must_use]
pub fn serialize_value(declared_type: DeclaredType, raw: Option<&Value>) -> String {
    let rendered = match raw {
        None | Some(Value::Null) => return String::new(),
        Some(value) => match declared_type.value_class() {
            ValueClass::Text => render_text(value),
            ValueClass::Integer => render_integer(value).unwrap_or_default(),
            ValueClass::Real => render_real(value).unwrap_or_default(),
            ValueClass::Opaque => return String::new(),
        },
    };
    rendered.trim().to_string()
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn render_integer(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(truncate_to_integer)
            }
        },
        Value::String(s) => parse_integer_text(s.trim()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_integer_text(text: &str) -> Option<String> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(i.to_string());
    }
    if let Ok(u) = text.parse::<u64>() {
        return Some(u.to_string());
    }
    parse_finite(text).map(truncate_to_integer)
}

fn truncate_to_integer(value: f64) -> String {
    let truncated = value.trunc();
    if truncated == 0.0 {
        // avoid "-0" for values in (-1, 0)
        return "0".to_string();
    }
    format!("{truncated:.0}")
}

fn render_real(value: &Value) -> Option<String> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_finite(s.trim()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }?;
    Some(format!("{number:.prec$}", prec = REAL_PRECISION))
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Projects one attribute map onto the schema.
///
/// The returned row always has `schema.len()` cells; attributes not named by
/// the schema are ignored and missing ones render empty.
#[must_use]
pub fn project_record(schema: &FieldSchema, attributes: Option<&Map<String, Value>>) -> Vec<String> {
    schema
        .iter()
        .map(|field| {
            let raw = attributes.and_then(|attrs| attrs.get(&field.name));
            serialize_value(field.declared_type, raw)
        })
        .collect()
}

/// Projects every feature of a payload onto the schema, preserving feature order.
///
/// A feature without an `attributes` object yields a row of empty cells.
#[must_use]
pub fn project_features(schema: &FieldSchema, features: &[Value]) -> Vec<Vec<String>> {
    features
        .iter()
        .map(|feature| {
            let attributes = feature.get("attributes").and_then(Value::as_object);
            project_record(schema, attributes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDef;
    use serde_json::json;

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![
            FieldDef::new("OBJECTID", DeclaredType::Oid),
            FieldDef::new("NAME", DeclaredType::String),
            FieldDef::new("AREA", DeclaredType::Double),
            FieldDef::new("SHAPE", DeclaredType::Geometry),
        ])
    }

    #[test]
    fn test_real_uses_five_fractional_digits() {
        assert_eq!(serialize_value(DeclaredType::Double, Some(&json!(3.1))), "3.10000");
        assert_eq!(serialize_value(DeclaredType::Single, Some(&json!(2))), "2.00000");
        assert_eq!(
            serialize_value(DeclaredType::Double, Some(&json!(-12.345678))),
            "-12.34568"
        );
        assert_eq!(
            serialize_value(DeclaredType::Double, Some(&json!(" 7.5 "))),
            "7.50000"
        );
    }

    #[test]
    fn test_integer_never_has_decimal_point() {
        assert_eq!(serialize_value(DeclaredType::Integer, Some(&json!(42.0))), "42");
        assert_eq!(serialize_value(DeclaredType::Integer, Some(&json!(42.9))), "42");
        assert_eq!(serialize_value(DeclaredType::SmallInteger, Some(&json!(-3.7))), "-3");
        assert_eq!(serialize_value(DeclaredType::Oid, Some(&json!(-0.4))), "0");
        assert_eq!(
            serialize_value(DeclaredType::Integer, Some(&json!(1_234_567_890_123_i64))),
            "1234567890123"
        );
        assert_eq!(
            serialize_value(DeclaredType::Integer, Some(&json!(u64::MAX))),
            "18446744073709551615"
        );
        assert_eq!(serialize_value(DeclaredType::Integer, Some(&json!("17"))), "17");
        assert_eq!(serialize_value(DeclaredType::Integer, Some(&json!("17.8"))), "17");
        assert_eq!(serialize_value(DeclaredType::Integer, Some(&json!(true))), "1");
    }

    #[test]
    fn test_non_numeric_values_in_numeric_fields_are_empty() {
        assert_eq!(serialize_value(DeclaredType::Integer, Some(&json!("abc"))), "");
        assert_eq!(
            serialize_value(DeclaredType::GlobalId, Some(&json!("{8F3A-11}"))),
            ""
        );
        assert_eq!(serialize_value(DeclaredType::Double, Some(&json!("NaN"))), "");
        assert_eq!(serialize_value(DeclaredType::Double, Some(&json!([1, 2]))), "");
    }

    #[test]
    fn test_text_passthrough_and_trim() {
        assert_eq!(
            serialize_value(DeclaredType::String, Some(&json!("  Site A \t"))),
            "Site A"
        );
        assert_eq!(
            serialize_value(DeclaredType::Date, Some(&json!(1_577_836_800_000_i64))),
            "1577836800000"
        );
        assert_eq!(
            serialize_value(DeclaredType::Guid, Some(&json!("{ABC-123}"))),
            "{ABC-123}"
        );
        assert_eq!(serialize_value(DeclaredType::String, Some(&json!(false))), "false");
    }

    #[test]
    fn test_opaque_always_empty() {
        let geometry = json!({"x": 1.5, "y": 2.5});
        assert_eq!(serialize_value(DeclaredType::Geometry, Some(&geometry)), "");
        assert_eq!(serialize_value(DeclaredType::Blob, Some(&json!("AAEC"))), "");
        assert_eq!(serialize_value(DeclaredType::Unknown, Some(&json!(5))), "");
    }

    #[test]
    fn test_null_and_missing_are_empty_for_every_type() {
        for ty in DeclaredType::ALL {
            assert_eq!(serialize_value(ty, None), "");
            assert_eq!(serialize_value(ty, Some(&Value::Null)), "");
        }
    }

    #[test]
    fn test_row_length_matches_schema() {
        let schema = schema();
        let extra = json!({"OBJECTID": 1, "UNRELATED": "x", "OTHER": 2});
        let row = project_record(&schema, extra.as_object());
        assert_eq!(row, vec!["1", "", "", ""]);

        let row = project_record(&schema, None);
        assert_eq!(row.len(), schema.len());
    }

    #[test]
    fn test_project_features_keeps_order() {
        let schema = schema();
        let features = vec![
            json!({"attributes": {"OBJECTID": 2, "NAME": "B", "AREA": 1.25, "SHAPE": "x"}}),
            json!({"attributes": {"OBJECTID": 1, "NAME": "A"}}),
            json!({"geometry": {"x": 0, "y": 0}}),
        ];

        let rows = project_features(&schema, &features);
        assert_eq!(
            rows,
            vec![
                vec!["2", "B", "1.25000", ""],
                vec!["1", "A", "", ""],
                vec!["", "", "", ""],
            ]
        );
    }

    #[test]
    fn test_duplicate_field_names_repeat_the_value() {
        let schema = FieldSchema::new(vec![
            FieldDef::new("NAME", DeclaredType::String),
            FieldDef::new("NAME", DeclaredType::String),
        ]);
        let attrs = json!({"NAME": "dup"});
        assert_eq!(project_record(&schema, attrs.as_object()), vec!["dup", "dup"]);
    }
}

//! Esri JSON query payload parsing.
//!
//! A layer payload is the JSON document returned by a map-service `query`
//! request. Only three members matter here: `fields` (the schema),
//! `features[].attributes` (the records) and `exceededTransferLimit`.

use layerdump_shared::{LayerFormatError, LayerFormatResult, SourcePosition};
use log::warn;
use serde_json::Value;

use crate::projector::project_features;
use crate::types::{DeclaredType, FieldDef, FieldSchema};

/// A converted layer: its schema plus one projected row per feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTable {
    pub schema: FieldSchema,
    pub rows: Vec<Vec<String>>,
    /// Whether the service truncated the result set.
    pub exceeded_transfer_limit: bool,
}

impl LayerTable {
    /// Header row: field names in schema order.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.schema.header()
    }
}

/// Parse raw payload bytes into a JSON document.
pub fn parse_payload(bytes: &[u8], context: &str) -> LayerFormatResult<Value> {
    serde_json::from_slice(bytes).map_err(|err| LayerFormatError::Parse {
        message: err.to_string(),
        position: Some(SourcePosition::from_json_error(&err)),
        context: Some(context.to_string()),
    })
}

/// Extract the ordered field schema from a payload.
///
/// # Errors
///
/// - [`LayerFormatError::Service`] when the payload is a service error document.
/// - [`LayerFormatError::SchemaMissing`] when there is no `fields` array.
/// - [`LayerFormatError::InvalidFieldDescriptor`] when a descriptor has no string `name`.
pub fn extract_schema(payload: &Value, context: &str) -> LayerFormatResult<FieldSchema> {
    let Some(descriptors) = payload.get("fields").and_then(Value::as_array) else {
        if let Some(error) = payload.get("error") {
            return Err(service_error(error, context));
        }
        return Err(LayerFormatError::SchemaMissing {
            context: Some(context.to_string()),
        });
    };

    let fields = descriptors
        .iter()
        .enumerate()
        .map(|(idx, descriptor)| field_from_descriptor(idx + 1, descriptor, context))
        .collect::<LayerFormatResult<Vec<_>>>()?;

    let schema = FieldSchema::new(fields);
    let duplicates = schema.duplicate_names();
    if !duplicates.is_empty() {
        warn!(
            "{context}: duplicate field names {duplicates:?}; repeated columns share one value"
        );
    }
    Ok(schema)
}

fn field_from_descriptor(
    index: usize,
    descriptor: &Value,
    context: &str,
) -> LayerFormatResult<FieldDef> {
    let invalid = |message: &str| LayerFormatError::InvalidFieldDescriptor {
        index,
        message: message.to_string(),
        context: Some(context.to_string()),
    };

    if !descriptor.is_object() {
        return Err(invalid("descriptor is not an object"));
    }
    let name = descriptor
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string `name`"))?;

    let declared_type = descriptor
        .get("type")
        .and_then(Value::as_str)
        .map_or(DeclaredType::Unknown, DeclaredType::from_esri);

    Ok(FieldDef {
        name: name.to_string(),
        declared_type,
        alias: descriptor
            .get("alias")
            .and_then(Value::as_str)
            .map(str::to_string),
        length: descriptor.get("length").and_then(Value::as_u64),
    })
}

fn service_error(error: &Value, context: &str) -> LayerFormatError {
    LayerFormatError::Service {
        code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown service error")
            .to_string(),
        context: Some(context.to_string()),
    }
}

/// Convert a parsed payload into a [`LayerTable`].
///
/// A payload without `features` converts to a header-only table.
pub fn payload_to_table(payload: &Value, context: &str) -> LayerFormatResult<LayerTable> {
    let schema = extract_schema(payload, context)?;

    let features = payload
        .get("features")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);
    let rows = project_features(&schema, features);

    let exceeded_transfer_limit = payload
        .get("exceededTransferLimit")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if exceeded_transfer_limit {
        warn!(
            "{context}: service reported exceededTransferLimit; only {} feature(s) were returned",
            rows.len()
        );
    }

    Ok(LayerTable {
        schema,
        rows,
        exceeded_transfer_limit,
    })
}

/// Parse raw payload bytes straight into a [`LayerTable`].
pub fn parse_layer_bytes(bytes: &[u8], context: impl Into<String>) -> LayerFormatResult<LayerTable> {
    let context = context.into();
    let payload = parse_payload(bytes, &context)?;
    payload_to_table(&payload, &context)
}

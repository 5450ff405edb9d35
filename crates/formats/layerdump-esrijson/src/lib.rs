//! Esri JSON layer payload support for `layerdump`.
//!
//! This crate turns the JSON returned by a map-service `query` request into a
//! flat table:
//!
//! - [`extract_schema`] reads the ordered `fields` array into a [`FieldSchema`].
//! - [`project_features`] renders each feature's `attributes` in schema order,
//!   dispatching on the [`ValueClass`] of every field's [`DeclaredType`].
//! - [`parse_layer_bytes`] runs both steps on raw payload bytes.
//!
//! # Examples
//!
//! ```
//! use layerdump_esrijson::parse_layer_bytes;
//!
//! let payload = br#"{
//!     "fields": [
//!         {"name": "OBJECTID", "type": "esriFieldTypeOID"},
//!         {"name": "AREA", "type": "esriFieldTypeDouble"}
//!     ],
//!     "features": [{"attributes": {"OBJECTID": 7, "AREA": 3.1}}]
//! }"#;
//!
//! let table = parse_layer_bytes(payload, "example").unwrap();
//! assert_eq!(table.header(), vec!["OBJECTID", "AREA"]);
//! assert_eq!(table.rows, vec![vec!["7", "3.10000"]]);
//! ```

pub mod parser;
pub mod projector;
pub mod types;

pub use parser::{LayerTable, extract_schema, parse_layer_bytes, parse_payload, payload_to_table};
pub use projector::{REAL_PRECISION, project_features, project_record, serialize_value};
pub use types::{DeclaredType, FieldDef, FieldSchema, ValueClass};

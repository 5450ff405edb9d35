//! Field schema types for Esri JSON query payloads.

use std::fmt;

/// Serialization class of a declared field type.
///
/// Every [`DeclaredType`] belongs to exactly one class, and the class alone
/// decides how a raw attribute value is rendered into a CSV cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    /// Passed through as text.
    Text,
    /// Rendered as a base-10 integer.
    Integer,
    /// Rendered as fixed-point text with 5 fractional digits.
    Real,
    /// Never rendered; always the empty string.
    Opaque,
}

impl ValueClass {
    /// Returns the display name of this class.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueClass::Text => "Text",
            ValueClass::Integer => "Integer",
            ValueClass::Real => "Real",
            ValueClass::Opaque => "Opaque",
        }
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a field, as reported by the map service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    String,
    Date,
    Guid,
    Integer,
    SmallInteger,
    Oid,
    GlobalId,
    Double,
    Single,
    Blob,
    Raster,
    Xml,
    Geometry,
    /// Any type string this crate does not recognise.
    Unknown,
}

impl DeclaredType {
    /// Every declared type, in registry order.
    pub const ALL: [DeclaredType; 14] = [
        DeclaredType::String,
        DeclaredType::Date,
        DeclaredType::Guid,
        DeclaredType::Integer,
        DeclaredType::SmallInteger,
        DeclaredType::Oid,
        DeclaredType::GlobalId,
        DeclaredType::Double,
        DeclaredType::Single,
        DeclaredType::Blob,
        DeclaredType::Raster,
        DeclaredType::Xml,
        DeclaredType::Geometry,
        DeclaredType::Unknown,
    ];

    /// Maps an Esri field type string (e.g. `"esriFieldTypeOID"`) to a declared type.
    ///
    /// Unrecognised strings map to [`DeclaredType::Unknown`].
    #[must_use]
    pub fn from_esri(type_name: &str) -> Self {
        match type_name {
            "esriFieldTypeString" => DeclaredType::String,
            "esriFieldTypeDate" => DeclaredType::Date,
            "esriFieldTypeGUID" => DeclaredType::Guid,
            "esriFieldTypeInteger" => DeclaredType::Integer,
            "esriFieldTypeSmallInteger" => DeclaredType::SmallInteger,
            "esriFieldTypeOID" => DeclaredType::Oid,
            "esriFieldTypeGlobalID" => DeclaredType::GlobalId,
            "esriFieldTypeDouble" => DeclaredType::Double,
            "esriFieldTypeSingle" => DeclaredType::Single,
            "esriFieldTypeBlob" => DeclaredType::Blob,
            "esriFieldTypeRaster" => DeclaredType::Raster,
            "esriFieldTypeXML" => DeclaredType::Xml,
            "esriFieldTypeGeometry" => DeclaredType::Geometry,
            _ => DeclaredType::Unknown,
        }
    }

    /// Returns the Esri type string for this type, if it has one.
    #[must_use]
    pub fn esri_name(&self) -> Option<&'static str> {
        let name = match self {
            DeclaredType::String => "esriFieldTypeString",
            DeclaredType::Date => "esriFieldTypeDate",
            DeclaredType::Guid => "esriFieldTypeGUID",
            DeclaredType::Integer => "esriFieldTypeInteger",
            DeclaredType::SmallInteger => "esriFieldTypeSmallInteger",
            DeclaredType::Oid => "esriFieldTypeOID",
            DeclaredType::GlobalId => "esriFieldTypeGlobalID",
            DeclaredType::Double => "esriFieldTypeDouble",
            DeclaredType::Single => "esriFieldTypeSingle",
            DeclaredType::Blob => "esriFieldTypeBlob",
            DeclaredType::Raster => "esriFieldTypeRaster",
            DeclaredType::Xml => "esriFieldTypeXML",
            DeclaredType::Geometry => "esriFieldTypeGeometry",
            DeclaredType::Unknown => return None,
        };
        Some(name)
    }

    /// Returns the serialization class of this type.
    #[must_use]
    pub fn value_class(&self) -> ValueClass {
        match self {
            DeclaredType::String | DeclaredType::Date | DeclaredType::Guid => ValueClass::Text,
            DeclaredType::Integer
            | DeclaredType::SmallInteger
            | DeclaredType::Oid
            | DeclaredType::GlobalId => ValueClass::Integer,
            DeclaredType::Double | DeclaredType::Single => ValueClass::Real,
            DeclaredType::Blob
            | DeclaredType::Raster
            | DeclaredType::Xml
            | DeclaredType::Geometry
            | DeclaredType::Unknown => ValueClass::Opaque,
        }
    }

    /// Returns the short display name of this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::String => "String",
            DeclaredType::Date => "Date",
            DeclaredType::Guid => "GUID",
            DeclaredType::Integer => "Integer",
            DeclaredType::SmallInteger => "SmallInteger",
            DeclaredType::Oid => "OID",
            DeclaredType::GlobalId => "GlobalID",
            DeclaredType::Double => "Double",
            DeclaredType::Single => "Single",
            DeclaredType::Blob => "Blob",
            DeclaredType::Raster => "Raster",
            DeclaredType::Xml => "XML",
            DeclaredType::Geometry => "Geometry",
            DeclaredType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column definition of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name; also the attribute key and the CSV header cell.
    pub name: String,
    /// Declared type.
    pub declared_type: DeclaredType,
    /// Human readable alias, when the service supplies one.
    pub alias: Option<String>,
    /// Maximum length, when the service supplies one.
    pub length: Option<u64>,
}

impl FieldDef {
    /// Creates a field definition without alias or length.
    pub fn new(name: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            alias: None,
            length: None,
        }
    }
}

/// Ordered field schema of a layer.
///
/// The order of `fields` is the column order of every projected row and of
/// the CSV header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Field names in schema order, i.e. the header row.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Names that occur more than once, in order of their second occurrence.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) && !duplicates.contains(&field.name.as_str()) {
                duplicates.push(field.name.as_str());
            }
        }
        duplicates
    }
}

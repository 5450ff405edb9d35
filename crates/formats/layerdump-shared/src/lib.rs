//! Error types shared by the `layerdump` format crates.
//!
//! Both the Esri JSON reader and the CSV writer report failures through
//! [`LayerFormatError`], so the core crate can treat every per-file problem
//! uniformly: log it with its context and move on to the next layer.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// A position within a layer payload.
///
/// All indices are 1-based where possible to align with human expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Column number in the source (1-based)
    pub column: Option<u64>,
}

impl SourcePosition {
    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.column.is_none()
    }

    /// Builds a position from the line/column reported by `serde_json`.
    ///
    /// `serde_json` reports `0` when no location is known (e.g. I/O errors),
    /// which maps to `None` here.
    #[must_use]
    pub fn from_json_error(err: &serde_json::Error) -> Self {
        let non_zero = |v: usize| (v > 0).then_some(v as u64);
        Self {
            line: non_zero(err.line()),
            column: non_zero(err.column()),
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(column) = self.column {
            parts.push(format!("column {column}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

fn fmt_context(context: Option<&str>) -> String {
    context.map(|c| format!(" in {c}")).unwrap_or_default()
}

fn fmt_position(position: Option<&SourcePosition>) -> String {
    position
        .filter(|pos| !pos.is_empty())
        .map(|pos| format!(" at {pos}"))
        .unwrap_or_default()
}

/// Errors raised while reading a layer payload or writing its table.
///
/// Every variant is local to one layer/file: callers skip the affected file
/// and continue with the rest of the run.
#[derive(Debug, Error)]
pub enum LayerFormatError {
    /// The payload is not valid JSON.
    #[error(
        "Parse error{}{}: {message}",
        fmt_context(context.as_deref()),
        fmt_position(position.as_ref())
    )]
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },

    /// The payload carries no `fields` array.
    #[error("Schema missing{}: payload has no `fields` array", fmt_context(context.as_deref()))]
    SchemaMissing {
        /// Optional context describing what was being read.
        context: Option<String>,
    },

    /// A field descriptor could not be interpreted.
    #[error(
        "Invalid field descriptor #{index}{}: {message}",
        fmt_context(context.as_deref())
    )]
    InvalidFieldDescriptor {
        /// Position of the descriptor in the `fields` array (1-based).
        index: usize,
        /// Human readable description of the failure.
        message: String,
        /// Optional context describing what was being read.
        context: Option<String>,
    },

    /// The map service answered with an error document instead of data.
    #[error("Service error {code}{}: {message}", fmt_context(context.as_deref()))]
    Service {
        /// Error code reported by the service.
        code: i64,
        /// Error message reported by the service.
        message: String,
        /// Optional context describing what was being read.
        context: Option<String>,
    },

    /// A table could not be created, written, flushed or moved into place.
    #[error("Write failed{}: {source}", fmt_context(context.as_deref()))]
    WriteFailed {
        /// The originating error.
        source: Box<dyn StdError + Send + Sync>,
        /// Optional context describing what was being written.
        context: Option<String>,
    },
}

impl LayerFormatError {
    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            LayerFormatError::Parse {
                context: existing, ..
            }
            | LayerFormatError::SchemaMissing { context: existing }
            | LayerFormatError::InvalidFieldDescriptor {
                context: existing, ..
            }
            | LayerFormatError::Service {
                context: existing, ..
            }
            | LayerFormatError::WriteFailed {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
        }
        self
    }

    /// Wraps any error as a [`LayerFormatError::WriteFailed`].
    pub fn write_failed<E>(source: E, context: impl Into<String>) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        LayerFormatError::WriteFailed {
            source: source.into(),
            context: Some(context.into()),
        }
    }

    /// Returns true when the payload lacked a usable schema.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            LayerFormatError::SchemaMissing { .. }
                | LayerFormatError::InvalidFieldDescriptor { .. }
                | LayerFormatError::Service { .. }
        )
    }
}

/// Result type alias that uses [`LayerFormatError`].
pub type LayerFormatResult<T> = Result<T, LayerFormatError>;

//! Custom error types for `layerdump` operations.
//!
//! Errors fall into two groups. Run-fatal errors (configuration, layer
//! selection) stop the run before any layer is processed. Every other error
//! is local to one layer or one file: it is logged, recorded in the run
//! report, and processing continues with the remaining layers.

use std::path::PathBuf;

use layerdump_shared::LayerFormatError;
use thiserror::Error;

/// Main error type for `layerdump` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum LayerdumpError {
    /// Layer selection errors (malformed spec, missing display names)
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// Network fetch errors for a single layer
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Payload parsing and CSV writing errors for a single file
    #[error(transparent)]
    Format(#[from] LayerFormatError),

    /// I/O errors (file read/write, directory setup)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Layer selection errors.
///
/// These occur while turning the configured layer expression into the list
/// of layers to process, and are fatal to the whole run.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// A token of the layer expression could not be parsed
    #[error("Malformed layer specification token '{token}': {reason}")]
    MalformedLayerSpec {
        /// The offending token, as written
        token: String,
        /// Why the token was rejected
        reason: String,
    },

    /// More layers were selected than display names were configured
    #[error("{ids} layer(s) selected but only {names} display name(s) configured")]
    TooFewNames {
        /// Number of resolved layer IDs
        ids: usize,
        /// Number of configured display names
        names: usize,
    },

    /// A layer ID maps to a display-name index that does not exist
    #[error(
        "No display name for layer {id}: name index {index} is out of range ({names} name(s) configured)"
    )]
    NameMissing {
        /// The layer ID
        id: u32,
        /// The display-name index the ID maps to
        index: usize,
        /// Number of configured display names
        names: usize,
    },
}

/// Fetch errors.
///
/// Each variant names the layer it belongs to; a fetch error skips that layer only.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {source}")]
    Client {
        /// The underlying error
        source: reqwest::Error,
    },

    /// The request URL could not be built from the base URL
    #[error("Invalid request URL for layer {layer} from base '{base_url}': {reason}")]
    InvalidUrl {
        /// The layer ID
        layer: u32,
        /// The configured base URL
        base_url: String,
        /// Why the URL is invalid
        reason: String,
    },

    /// The request could not be sent or timed out
    #[error("Fetch failed for layer {layer} ({url}): {source}")]
    Request {
        /// The layer ID
        layer: u32,
        /// The request URL
        url: String,
        /// The underlying error
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Fetch failed for layer {layer} ({url}): HTTP status {status}")]
    Status {
        /// The layer ID
        layer: u32,
        /// The request URL
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The response body could not be read
    #[error("Fetch failed for layer {layer} ({url}): could not read response body: {source}")]
    Body {
        /// The layer ID
        layer: u32,
        /// The request URL
        url: String,
        /// The underlying error
        source: reqwest::Error,
    },

    /// Any other source-specific failure
    #[error("Fetch failed for layer {layer}: {message}")]
    Other {
        /// The layer ID
        layer: u32,
        /// Description of the failure
        message: String,
    },
}

impl FetchError {
    /// Layer this error belongs to, if any.
    #[must_use]
    pub fn layer(&self) -> Option<u32> {
        match self {
            Self::Client { .. } => None,
            Self::InvalidUrl { layer, .. }
            | Self::Request { layer, .. }
            | Self::Status { layer, .. }
            | Self::Body { layer, .. }
            | Self::Other { layer, .. } => Some(*layer),
        }
    }

    /// Returns `true` if the request hit the configured timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Request { source, .. } | Self::Body { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// I/O related errors.
///
/// These errors occur during file or directory operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g., "JSON")
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write to a file
    #[error("Failed to write {format} file '{path}': {source}")]
    Write {
        /// The format being written
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to create, clear or list a directory
    #[error("Failed to prepare directory '{path}': {source}")]
    Directory {
        /// The directory path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// A conversion task did not complete
    #[error("Conversion task for '{path}' did not complete: {message}")]
    Task {
        /// The source file of the task
        path: PathBuf,
        /// Why the task failed
        message: String,
    },
}

/// Configuration errors.
///
/// These errors occur when the configuration file is missing, unparsable or
/// carries invalid values. They are fatal to the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        /// The configuration path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has the wrong shape
    #[error("Failed to parse configuration '{origin}': {source}")]
    Parse {
        /// Where the configuration came from
        origin: String,
        /// The underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },

    /// Required option is missing or empty
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },
}

/// Type alias for Results using `LayerdumpError`.
pub type Result<T> = std::result::Result<T, LayerdumpError>;

impl LayerdumpError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Selector(e) => format!("Layer selection error: {e}"),
            Self::Fetch(e) => e.to_string(),
            Self::Format(e) => e.to_string(),
            Self::Io(e) => e.user_message(),
            Self::Config(e) => format!("Configuration error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Selector(SelectorError::MalformedLayerSpec { .. }) => Some(
                "Use comma-separated layer IDs and ranges, e.g. layer_numbers = \"0,2-4,7\"."
                    .to_string(),
            ),
            Self::Selector(_) => Some(
                "Add a display name to layer_names for every selected layer (layer N uses name N-1, layer 0 uses the first name)."
                    .to_string(),
            ),
            Self::Fetch(e) if e.is_timeout() => {
                Some("Increase request_timeout_secs or check the service status.".to_string())
            },
            Self::Fetch(FetchError::InvalidUrl { .. }) => {
                Some("Check data_url in the configuration file.".to_string())
            },
            Self::Format(e) if e.is_schema_error() => Some(
                "Inspect the raw JSON file; the service may have returned an error page or an empty layer."
                    .to_string(),
            ),
            Self::Io(e) => e.recovery_suggestion(),
            Self::Config(ConfigError::Read { .. }) => {
                Some("Pass the configuration path with --config.".to_string())
            },
            _ => None,
        }
    }

    /// Check if this error stops the whole run.
    ///
    /// Only errors that prevent establishing the set of layers to process are
    /// run-fatal; everything else affects a single layer or file.
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Selector(_) | Self::Config(_))
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, .. } => {
                format!("Failed to read {} file: {}", format, path.display())
            },
            Self::Write { format, path, .. } => {
                format!("Failed to write {} file: {}", format, path.display())
            },
            Self::Directory { .. } | Self::Task { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Write { .. } | Self::Directory { .. } => Some(
                "Check that the output directory exists, is writable and has free space."
                    .to_string(),
            ),
            Self::Read { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            Self::Task { .. } => None,
        }
    }
}

/// Extension trait for adding I/O context to errors.
///
/// This trait provides convenient methods to wrap errors with file and format
/// context, creating more informative error messages.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;

    /// Add write context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Write`] if the underlying operation fails.
    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            LayerdumpError::Io(IoError::Read {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }

    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            LayerdumpError::Io(IoError::Write {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }
}

//! Run configuration.
//!
//! The configuration is read once from a TOML file and then passed by
//! reference into every stage of a run.
//!
//! ```toml
//! data_url = "https://example.com/arcgis/rest/services/City/MapServer"
//! layer_numbers = "0,2-4"
//! output_directory = "output"
//! layer_names = ["Roads", "Rivers", "Parcels", "Sites"]
//! file_logging_enabled = false
//! prompt_for_run = false
//! request_timeout_secs = 30
//! max_concurrent_requests = 1
//! csv_delimiter = ","
//! csv_line_terminator = "lf"
//! csv_include_header = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use url::Url;

use layerdump_csv::{CsvWriterOptions, LineTerminator};

use crate::error::ConfigError;

/// Default configuration file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Name of the CSV subdirectory inside the output directory.
pub const CSV_SUBDIRECTORY: &str = "csv";

/// Name of the log file written when file logging is enabled.
pub const LOG_FILE_NAME: &str = "log.txt";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1;
const DEFAULT_CSV_DELIMITER: char = ',';

/// Record terminator written into converted CSV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvLineTerminator {
    #[default]
    Lf,
    Crlf,
}

impl From<CsvLineTerminator> for LineTerminator {
    fn from(value: CsvLineTerminator) -> Self {
        match value {
            CsvLineTerminator::Lf => LineTerminator::Lf,
            CsvLineTerminator::Crlf => LineTerminator::Crlf,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the map service; layer IDs are appended to it.
    pub data_url: String,
    /// Layer expression, e.g. `"0,2-4,7"`.
    pub layer_numbers: String,
    /// Directory receiving raw JSON payloads (and the `csv` subdirectory).
    pub output_directory: PathBuf,
    /// Display names, indexed by layer ID (see [`crate::selector`]).
    #[serde(default, deserialize_with = "deserialize_layer_names")]
    pub layer_names: Vec<String>,
    /// Write logs to `log.txt` instead of stderr.
    #[serde(default)]
    pub file_logging_enabled: bool,
    /// Wait for the user to press enter before starting.
    #[serde(default)]
    pub prompt_for_run: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum number of layers fetched or converted at once.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Column delimiter of converted CSV files; must be a single ASCII character.
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,
    /// Record terminator of converted CSV files.
    #[serde(default)]
    pub csv_line_terminator: CsvLineTerminator,
    /// Write the field names as the first CSV row.
    #[serde(default = "default_true")]
    pub csv_include_header: bool,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_csv_delimiter() -> char {
    DEFAULT_CSV_DELIMITER
}

fn default_true() -> bool {
    true
}

/// Accepts either a TOML array of names or one comma-separated string.
fn deserialize_layer_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNames {
        List(Vec<String>),
        Joined(String),
    }

    let names = match RawNames::deserialize(deserializer)? {
        RawNames::List(names) => names,
        RawNames::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(names.into_iter().map(|n| n.trim().to_string()).collect())
}

impl AppConfig {
    /// Read and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, is not valid
    /// TOML, or fails validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is not valid TOML or fails validation.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check option values.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_url.trim().is_empty() {
            return Err(missing("data_url"));
        }
        let url = Url::parse(self.data_url.trim()).map_err(|e| invalid("data_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "data_url",
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
            ));
        }
        if self.layer_numbers.trim().is_empty() {
            return Err(missing("layer_numbers"));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(missing("output_directory"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(invalid("max_concurrent_requests", "must be at least 1"));
        }
        if !self.csv_delimiter.is_ascii() || matches!(self.csv_delimiter, '"' | '\n' | '\r') {
            return Err(invalid(
                "csv_delimiter",
                format!(
                    "{:?} cannot be used, expected an ASCII character other than a quote or line break",
                    self.csv_delimiter
                ),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Writer options for converted CSV files.
    #[must_use]
    pub fn csv_writer_options(&self) -> CsvWriterOptions {
        // validate() restricts the delimiter to ASCII
        let delimiter = u8::try_from(self.csv_delimiter).unwrap_or(b',');
        CsvWriterOptions::new()
            .with_delimiter(delimiter)
            .with_header(self.csv_include_header)
            .with_line_terminator(self.csv_line_terminator.into())
    }

    /// Directory receiving converted CSV files.
    #[must_use]
    pub fn csv_directory(&self) -> PathBuf {
        self.output_directory.join(CSV_SUBDIRECTORY)
    }
}

fn missing(option: &str) -> ConfigError {
    ConfigError::MissingRequired {
        option: option.to_string(),
    }
}

fn invalid(option: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOption {
        option: option.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        data_url = "https://example.com/arcgis/rest/services/City/MapServer"
        layer_numbers = "0,2-4"
        output_directory = "output"
        layer_names = ["Roads", "Rivers", "Parcels", "Sites"]
        file_logging_enabled = true
        prompt_for_run = true
        request_timeout_secs = 5
        max_concurrent_requests = 4
        csv_delimiter = ";"
        csv_line_terminator = "crlf"
        csv_include_header = false
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml_str(FULL, "test").unwrap();

        assert_eq!(config.layer_numbers, "0,2-4");
        assert_eq!(config.layer_names, vec!["Roads", "Rivers", "Parcels", "Sites"]);
        assert!(config.file_logging_enabled);
        assert!(config.prompt_for_run);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_concurrent_requests, 4);
        assert_eq!(config.csv_directory(), PathBuf::from("output").join("csv"));

        let options = config.csv_writer_options();
        assert_eq!(options.delimiter, b';');
        assert_eq!(options.line_terminator, LineTerminator::Crlf);
        assert!(!options.has_header);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            data_url = "http://localhost/MapServer"
            layer_numbers = "1"
            output_directory = "out"
            "#,
            "test",
        )
        .unwrap();

        assert!(config.layer_names.is_empty());
        assert!(!config.file_logging_enabled);
        assert!(!config.prompt_for_run);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_concurrent_requests, 1);
        assert_eq!(config.csv_delimiter, ',');
        assert_eq!(config.csv_line_terminator, CsvLineTerminator::Lf);
        assert!(config.csv_include_header);
        assert_eq!(config.csv_writer_options(), CsvWriterOptions::default());
    }

    #[test]
    fn test_comma_separated_names_are_trimmed() {
        let config = AppConfig::from_toml_str(
            r#"
            data_url = "http://localhost/MapServer"
            layer_numbers = "1-2"
            output_directory = "out"
            layer_names = "Roads, Rivers ,Parcels"
            "#,
            "test",
        )
        .unwrap();

        assert_eq!(config.layer_names, vec!["Roads", "Rivers", "Parcels"]);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = AppConfig::from_toml_str(&format!("{}\nextra = 1\n", FULL), "cfg.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("cfg.toml"));
    }

    #[test]
    fn test_rejects_bad_url() {
        let err = AppConfig::from_toml_str(
            r#"
            data_url = "ftp://example.com/MapServer"
            layer_numbers = "1"
            output_directory = "out"
            "#,
            "test",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "data_url"));

        let err = AppConfig::from_toml_str(
            r#"
            data_url = "not a url"
            layer_numbers = "1"
            output_directory = "out"
            "#,
            "test",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { .. }));
    }

    #[test]
    fn test_rejects_zero_limits_and_empty_values() {
        let base = |extra: &str| {
            format!(
                "data_url = \"http://h/MapServer\"\nlayer_numbers = \"1\"\noutput_directory = \"o\"\n{extra}"
            )
        };

        let err = AppConfig::from_toml_str(&base("request_timeout_secs = 0"), "t").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid request_timeout_secs option: must be at least 1"
        );

        let err = AppConfig::from_toml_str(&base("max_concurrent_requests = 0"), "t").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { .. }));

        let err = AppConfig::from_toml_str(
            "data_url = \"http://h/MapServer\"\nlayer_numbers = \"  \"\noutput_directory = \"o\"\n",
            "t",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required option: layer_numbers");
    }

    #[test]
    fn test_rejects_unusable_csv_options() {
        let base = |extra: &str| {
            format!(
                "data_url = \"http://h/MapServer\"\nlayer_numbers = \"1\"\noutput_directory = \"o\"\n{extra}"
            )
        };

        for delimiter in ["'\"'", "\"\\n\"", "\"é\""] {
            let err = AppConfig::from_toml_str(&base(&format!("csv_delimiter = {delimiter}")), "t")
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "csv_delimiter"),
                "expected csv_delimiter error for {delimiter}, got {err}"
            );
        }

        let err = AppConfig::from_toml_str(&base("csv_delimiter = \";;\""), "t").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = AppConfig::from_toml_str(&base("csv_line_terminator = \"cr\""), "t").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let config = AppConfig::from_toml_str(&base("csv_delimiter = \"\\t\""), "t").unwrap();
        assert_eq!(config.csv_writer_options().delimiter, b'\t');
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_path("/definitely/not/here/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

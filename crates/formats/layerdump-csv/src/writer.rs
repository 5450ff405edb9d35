//! CSV writer implementation for projected layer tables

use std::io::Write as IoWrite;
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use layerdump_shared::{LayerFormatError, LayerFormatResult};
use tempfile::NamedTempFile;

/// Line terminator written after every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    Crlf,
}

/// Options for CSV writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvWriterOptions {
    /// Column delimiter (default: b',')
    pub delimiter: u8,
    /// Whether to write header row (default: true)
    pub has_header: bool,
    /// Record terminator (default: LF)
    pub line_terminator: LineTerminator,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            line_terminator: LineTerminator::Lf,
        }
    }
}

impl CsvWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set column delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether to write header row
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set record terminator
    #[must_use]
    pub fn with_line_terminator(mut self, line_terminator: LineTerminator) -> Self {
        self.line_terminator = line_terminator;
        self
    }

    fn builder(&self) -> WriterBuilder {
        let terminator = match self.line_terminator {
            LineTerminator::Lf => Terminator::Any(b'\n'),
            LineTerminator::Crlf => Terminator::CRLF,
        };

        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .terminator(terminator)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .flexible(false)
            .has_headers(false);
        builder
    }
}

/// Write a header and rows as CSV
///
/// Fields containing the delimiter, a quote, CR or LF are quoted and embedded
/// quotes are doubled. Every row must have as many cells as the header.
///
/// # Errors
///
/// Returns [`LayerFormatError::WriteFailed`] if writing to the output fails or
/// a row has the wrong number of cells
pub fn write_csv<W, H, R, S>(
    writer: &mut W,
    header: &[H],
    rows: &[R],
    options: &CsvWriterOptions,
) -> LayerFormatResult<()>
where
    W: IoWrite,
    H: AsRef<str>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut csv_writer = options.builder().from_writer(writer);
    let failed = |e: csv::Error| LayerFormatError::write_failed(e, "csv record");

    if options.has_header {
        csv_writer
            .write_record(header.iter().map(|h| h.as_ref().as_bytes()))
            .map_err(failed)?;
    }
    for row in rows {
        if row.as_ref().len() != header.len() {
            return Err(LayerFormatError::write_failed(
                format!(
                    "row has {} cells but the header has {}",
                    row.as_ref().len(),
                    header.len()
                ),
                "csv record",
            ));
        }
        csv_writer
            .write_record(row.as_ref().iter().map(|cell| cell.as_ref().as_bytes()))
            .map_err(failed)?;
    }

    csv_writer
        .flush()
        .map_err(|e| LayerFormatError::write_failed(e, "csv flush"))
}

/// Write a header and rows to CSV bytes
///
/// # Errors
///
/// Returns an error if CSV serialization fails
pub fn write_csv_to_bytes<H, R, S>(
    header: &[H],
    rows: &[R],
    options: &CsvWriterOptions,
) -> LayerFormatResult<Vec<u8>>
where
    H: AsRef<str>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut buffer = Vec::new();
    write_csv(&mut buffer, header, rows, options)?;
    Ok(buffer)
}

/// Write a header and rows to a CSV file, atomically
///
/// The table is written to a temporary file next to `path`, flushed to disk,
/// and renamed over `path`. On failure the temporary file is removed and
/// `path` is left untouched.
///
/// # Errors
///
/// Returns [`LayerFormatError::WriteFailed`] naming `path` if any step fails
pub fn write_csv_file<H, R, S>(
    path: &Path,
    header: &[H],
    rows: &[R],
    options: &CsvWriterOptions,
) -> LayerFormatResult<()>
where
    H: AsRef<str>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let context = path.display().to_string();
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| LayerFormatError::write_failed(e, context.as_str()))?;
    write_csv(temp.as_file_mut(), header, rows, options)
        .map_err(|e| e.with_additional_context(context.as_str()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| LayerFormatError::write_failed(e, context.as_str()))?;
    temp.persist(path)
        .map_err(|e| LayerFormatError::write_failed(e.error, context.as_str()))?;

    Ok(())
}

//! CSV table output for `layerdump`.
//!
//! Writes a header row followed by projected data rows using the `csv` crate's
//! standard quoting rules, either into any [`std::io::Write`] or atomically
//! into a file on disk.

pub mod writer;

pub use writer::{CsvWriterOptions, LineTerminator, write_csv, write_csv_file, write_csv_to_bytes};

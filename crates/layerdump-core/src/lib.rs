//! `layerdump-core` is the core library for `layerdump`, which downloads the
//! feature layers of a map service and converts each one to a CSV file.
//!
//! This crate includes:
//! - **Configuration**: the TOML run configuration ([`config`]).
//! - **Layer Selection**: layer expression expansion and display-name lookup ([`selector`]).
//! - **Fetching**: the [`fetch::LayerSource`] boundary and its HTTP implementation.
//! - **Operations**: the fetch and convert stages and the full run ([`operations`]).
//!
//! Payload parsing lives in `layerdump-esrijson` and CSV writing in `layerdump-csv`.

pub mod config;
pub mod error;
pub mod fetch;
pub mod operations;
pub mod selector;
pub mod types;

pub use config::AppConfig;
pub use error::{LayerdumpError, Result};
pub use fetch::{HttpLayerSource, LayerSource};
pub use types::{ConvertReport, FetchReport, LayerRef, RunReport};

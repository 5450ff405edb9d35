//! Layer selection: expanding the layer expression and naming each layer.
//!
//! A layer expression is a comma-separated list of tokens, each either a
//! single layer ID (`"7"`) or an inclusive range (`"2-4"`). Tokens expand
//! left to right and ranges expand in ascending order, so `"0,2-4,7"` selects
//! `[0, 2, 3, 4, 7]`. A range whose start is greater than its end selects
//! nothing.
//!
//! Display names are looked up by ID: layer `0` uses the first name, and any
//! other layer `n` uses name `n - 1`. Services commonly number their layers
//! from either 0 or 1, and output file names depend on this exact rule.
//!
//! # Examples
//!
//! ```
//! use layerdump_core::selector::{parse_layer_spec, resolve_layers};
//!
//! let names = vec!["Roads".to_string(), "Rivers".to_string(), "Parcels".to_string()];
//! let ids = parse_layer_spec("0,2-3", names.len()).unwrap();
//! assert_eq!(ids, vec![0, 2, 3]);
//!
//! let layers = resolve_layers(&ids, &names).unwrap();
//! assert_eq!(layers[0].name, "Roads");
//! assert_eq!(layers[1].name, "Rivers");
//! assert_eq!(layers[2].name, "Parcels");
//! ```

use std::collections::HashMap;
use std::ops::RangeInclusive;

use log::{debug, warn};

use crate::config::AppConfig;
use crate::error::SelectorError;
use crate::types::LayerRef;

/// Expand a layer expression into concrete layer IDs.
///
/// Whitespace around tokens and range bounds is ignored. The expression is
/// fully parsed and its expanded length counted before any ID is
/// materialized, so a wide range such as `"0-4294967295"` fails cleanly.
///
/// # Errors
///
/// - [`SelectorError::MalformedLayerSpec`] for an empty token or a token that
///   is not a non-negative integer or `start-end` pair.
/// - [`SelectorError::TooFewNames`] if the expression selects more than
///   `max_ids` layers.
pub fn parse_layer_spec(spec: &str, max_ids: usize) -> Result<Vec<u32>, SelectorError> {
    let ranges = spec
        .split(',')
        .map(parse_token)
        .collect::<Result<Vec<_>, _>>()?;

    let total = count_ids(&ranges);
    if total > max_ids as u64 {
        return Err(SelectorError::TooFewNames {
            ids: usize::try_from(total).unwrap_or(usize::MAX),
            names: max_ids,
        });
    }

    Ok(ranges.into_iter().flatten().collect())
}

/// Number of IDs a parsed expression expands to.
fn count_ids(ranges: &[RangeInclusive<u32>]) -> u64 {
    ranges
        .iter()
        .map(|range| {
            if range.start() > range.end() {
                0
            } else {
                u64::from(*range.end()) - u64::from(*range.start()) + 1
            }
        })
        .fold(0u64, u64::saturating_add)
}

fn parse_token(raw_token: &str) -> Result<RangeInclusive<u32>, SelectorError> {
    let token = raw_token.trim();
    if token.is_empty() {
        return Err(malformed(raw_token, "empty token"));
    }

    if let Some((start, end)) = token.split_once('-') {
        let start = parse_id(start, token)?;
        let end = parse_id(end, token)?;
        debug!("Expanding layer range {start}-{end}");
        Ok(start..=end)
    } else {
        let id = parse_id(token, token)?;
        Ok(id..=id)
    }
}

fn parse_id(text: &str, token: &str) -> Result<u32, SelectorError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(malformed(token, "missing layer ID"));
    }
    text.parse::<u32>()
        .map_err(|e| malformed(token, format!("'{text}' is not a layer ID ({e})")))
}

fn malformed(token: &str, reason: impl Into<String>) -> SelectorError {
    SelectorError::MalformedLayerSpec {
        token: token.to_string(),
        reason: reason.into(),
    }
}

/// Index into the display-name list used for a layer ID.
///
/// Layer `0` maps to index `0`; every other layer `n` maps to `n - 1`.
#[must_use]
pub fn name_index(id: u32) -> usize {
    if id == 0 { 0 } else { id as usize - 1 }
}

/// Pair each layer ID with its display name.
///
/// # Errors
///
/// - [`SelectorError::TooFewNames`] if more IDs were selected than names exist.
/// - [`SelectorError::NameMissing`] if an ID's name index is out of range.
pub fn resolve_layers(ids: &[u32], names: &[String]) -> Result<Vec<LayerRef>, SelectorError> {
    if ids.len() > names.len() {
        return Err(SelectorError::TooFewNames {
            ids: ids.len(),
            names: names.len(),
        });
    }

    ids.iter()
        .map(|&id| {
            let index = name_index(id);
            names
                .get(index)
                .map(|name| LayerRef::new(id, name.clone()))
                .ok_or(SelectorError::NameMissing {
                    id,
                    index,
                    names: names.len(),
                })
        })
        .collect()
}

/// Layers whose raw payloads would be written to the same file.
///
/// Returns each shared file name with the IDs that map to it, in selection
/// order. Under the name-index rule layers `0` and `1` always collide.
#[must_use]
pub fn shared_file_names(layers: &[LayerRef]) -> Vec<(String, Vec<u32>)> {
    let mut order = Vec::new();
    let mut by_file: HashMap<String, Vec<u32>> = HashMap::new();
    for layer in layers {
        let file = layer.raw_file_name();
        let ids = by_file.entry(file.clone()).or_default();
        if ids.is_empty() {
            order.push(file);
        }
        ids.push(layer.id);
    }

    order
        .into_iter()
        .filter_map(|file| {
            let ids = by_file.remove(&file)?;
            (ids.len() > 1).then_some((file, ids))
        })
        .collect()
}

/// Resolve the configured layer expression into named layers.
///
/// Layers sharing an output file are kept and logged as a warning; the last
/// one fetched wins.
///
/// # Errors
///
/// Returns a [`SelectorError`] if the expression is malformed, selects more
/// layers than there are names, or a layer has no display name.
pub fn select_layers(config: &AppConfig) -> Result<Vec<LayerRef>, SelectorError> {
    resolve_layer_spec(&config.layer_numbers, &config.layer_names)
}

/// Expand `spec` and name each layer from `names`.
///
/// # Errors
///
/// Returns a [`SelectorError`] if the expression is malformed, selects more
/// layers than there are names, or a layer has no display name.
pub fn resolve_layer_spec(spec: &str, names: &[String]) -> Result<Vec<LayerRef>, SelectorError> {
    let ids = parse_layer_spec(spec, names.len())?;
    debug!("Selected layer IDs: {ids:?}");
    let layers = resolve_layers(&ids, names)?;

    for (file, ids) in shared_file_names(&layers) {
        warn!("Layers {ids:?} all write to {file}; only the last one fetched is kept");
    }
    Ok(layers)
}

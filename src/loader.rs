//! Loading of per-item analysis records
//!
//! The feature extractor writes one JSON document per audio file. Each document
//! carries an `id` plus nested descriptor namespaces (`stats`, `classifications`,
//! `metadata`, ...). Numbers may be serialised as strings. This module walks a
//! data directory, coerces those strings to numbers and flattens every document
//! into an [`ItemRecord`] with `_`-joined column names.

use std::fs;
use std::path::Path;
use serde_json::Value;
use walkdir::WalkDir;
use crate::errors::{IOErrorContext, SimilarityError, SimilarityResult};
use crate::performance::PerformanceTracker;
use crate::types::{ItemRecord, COLUMN_SEPARATOR};
use crate::validation;

/// Key holding the item identifier at the top level of each document
pub const ID_KEY: &str = "id";

/// Load every `*.json` analysis record below `data_path`
///
/// Files that cannot be read or decoded are logged and skipped, as are
/// documents without a usable `id`.
pub fn load_records(data_path: &Path) -> SimilarityResult<Vec<ItemRecord>> {
    let tracker = PerformanceTracker::start("load_records");
    validation::validate_is_directory(data_path)?;

    let mut records = Vec::new();
    for entry in WalkDir::new(data_path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("⚠️ Error reading directory entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !validation::is_analysis_record(path) {
            continue;
        }

        match load_record_file(path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("⚠️ Skipping {}: {}", path.display(), e),
        }
    }

    tracker.finish();
    log::info!("📂 Loaded {} analysis records from {}", records.len(), data_path.display());
    Ok(records)
}

/// Load a single analysis document. `Ok(None)` means the document has no id.
pub fn load_record_file(path: &Path) -> SimilarityResult<Option<ItemRecord>> {
    let path_str = path.to_string_lossy();
    let content = fs::read_to_string(path).with_path_context(&path_str, "read")?;
    let document: Value = serde_json::from_str(&content).map_err(|e| SimilarityError::Parse {
        path: path_str.to_string(),
        message: e.to_string(),
    })?;

    let record = parse_document(document);
    if record.is_none() {
        log::warn!("⚠️ No usable '{}' in {}, skipping", ID_KEY, path.display());
    }
    Ok(record)
}

/// Turn a decoded document into a record
///
/// The id is read before numeric coercion so that identifiers made of digits
/// stay strings.
pub fn parse_document(mut document: Value) -> Option<ItemRecord> {
    let object = document.as_object_mut()?;
    let id = match object.shift_remove(ID_KEY)? {
        Value::String(id) => id,
        Value::Number(number) => number.to_string(),
        _ => return None,
    };

    let mut rest = Value::Object(std::mem::take(object));
    coerce_numbers(&mut rest);

    Some(ItemRecord {
        id,
        features: flatten_record(&rest),
    })
}

/// Recursively convert strings that parse as floats into JSON numbers
pub fn coerce_numbers(value: &mut Value) {
    match value {
        Value::Object(map) => map.values_mut().for_each(coerce_numbers),
        Value::Array(items) => items.iter_mut().for_each(coerce_numbers),
        Value::String(text) => {
            if let Some(number) = parse_number(text).and_then(serde_json::Number::from_f64) {
                *value = Value::Number(number);
            }
        }
        _ => {}
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Flatten a nested document into `_`-joined column names
///
/// Arrays expand into indexed columns (`<key>_<idx>`). Booleans map to 1/0;
/// nulls and non-numeric strings are null.
pub fn flatten_record(value: &Value) -> Vec<(String, Option<f64>)> {
    let mut features = Vec::new();
    flatten_into(value, String::new(), &mut features);
    features
}

fn flatten_into(value: &Value, prefix: String, out: &mut Vec<(String, Option<f64>)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, join_key(&prefix, key), out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                flatten_into(child, join_key(&prefix, &idx.to_string()), out);
            }
        }
        leaf if !prefix.is_empty() => out.push((prefix, scalar_value(leaf))),
        _ => {}
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", prefix, COLUMN_SEPARATOR, key)
    }
}

fn scalar_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => parse_number(text).filter(|number| number.is_finite()),
        _ => None,
    }
}

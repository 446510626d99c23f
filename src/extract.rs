// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Discovery of variant directories and result files, and extraction of
//! records from the `aggregated_metrics` block of each file.
//!
//! Result files are produced by many different harness versions and are
//! often partial. Anything that does not look like a number is skipped
//! without failing the file, and files that do not parse are skipped
//! entirely.

use crate::catalog::{MEAN_AGGREGATES, VALUE_AGGREGATES};
use crate::{Error, Record};

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Returns the immediate subdirectories of `root`, sorted.
pub fn variant_dirs(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = fs::read_dir(root).map_err(|source| Error::ReadDir {
        path: root.to_owned(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::ReadDir {
            path: root.to_owned(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Returns the `*.json` files directly inside `dir`, sorted. A directory that
/// cannot be listed yields no files.
pub fn result_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("skipping unreadable directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// Records from every result file of one variant directory. The variant is
/// labelled with the directory name.
pub fn load_variant(dir: &Path) -> Vec<Record> {
    let platform = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut records = Vec::new();
    for file in result_files(dir) {
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) => {
                debug!("skipping {}: {}", file.display(), e);
                continue;
            }
        };
        let document: JsonValue = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                debug!("skipping {}: {}", file.display(), e);
                continue;
            }
        };
        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let before = records.len();
        records.extend(extract_records(&document, &platform, &filename));
        trace!("{}: {} records", file.display(), records.len() - before);
    }
    records
}

/// Flattens one parsed result document into records.
///
/// `filename` is only consulted for the concurrency level when the document
/// does not carry `num_concurrency`.
pub fn extract_records(document: &JsonValue, platform: &str, filename: &str) -> Vec<Record> {
    let empty = Map::new();
    let aggregated = document
        .get("aggregated_metrics")
        .and_then(JsonValue::as_object)
        .unwrap_or(&empty);

    let scenario = aggregated
        .get("scenario")
        .and_then(JsonValue::as_str)
        .map(str::to_owned);
    let concurrency = match aggregated.get("num_concurrency") {
        Some(value) => to_concurrency(value),
        None => concurrency_from_filename(filename),
    };

    let record = |metric: &str, stat: &str, value: f64| Record {
        platform_label: platform.to_owned(),
        scenario: scenario.clone(),
        metric_base: metric.to_owned(),
        stat: stat.to_lowercase(),
        concurrency,
        value,
    };

    let mut records = Vec::new();

    if let Some(stats) = aggregated.get("stats").and_then(JsonValue::as_object) {
        for (metric, by_stat) in stats {
            if let Some(by_stat) = by_stat.as_object() {
                for (stat, value) in by_stat {
                    if let Some(value) = to_float(value) {
                        records.push(record(metric.as_str(), stat.as_str(), value));
                    }
                }
            }
        }
    }

    for metric in MEAN_AGGREGATES {
        if let Some(value) = aggregated.get(*metric).and_then(to_float) {
            records.push(record(*metric, "mean", value));
        }
    }

    for metric in VALUE_AGGREGATES {
        if let Some(value) = aggregated.get(*metric).and_then(to_float) {
            records.push(record(*metric, "value", value));
        }
    }

    records
}

/// Best-effort numeric coercion of a JSON value.
///
/// Numbers pass through, booleans count as 1 or 0, and strings are parsed
/// after trimming unless they look like embedded JSON. The result is always
/// finite.
pub fn to_float(value: &JsonValue) -> Option<f64> {
    let value = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.starts_with('{') || s.starts_with('[') {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Concurrency from a `num_concurrency` value: a non-negative integer, an
/// integral float, or a string holding either.
fn to_concurrency(value: &JsonValue) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<u64>() {
                return Some(n);
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Concurrency encoded in a result file name as `_concurrency_<N>_`.
pub fn concurrency_from_filename(filename: &str) -> Option<u64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"_concurrency_(\d+)_").expect("concurrency pattern is a valid regex")
    });
    pattern
        .captures(filename)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

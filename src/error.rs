// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::path::PathBuf;

use thiserror::Error;

/// Failures that end the run. Problems with individual result files are
/// not errors; those files or values are skipped.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no numeric data found under {0}")]
    NoData(PathBuf),
    #[error("--concurrencies must be a comma separated list of integers (e.g. '1,2,4,8,16,32'), got '{0}'")]
    InvalidConcurrencies(String),
    #[error("invalid legend format '{template}': {reason}")]
    LegendFormat { template: String, reason: String },
    #[error("failed to load config file {path}: {reason}")]
    Config { path: PathBuf, reason: String },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render {path}: {reason}")]
    Render { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Aggregates benchmark result files from several variants and renders
//! comparison charts of the headline metrics against concurrency.
//!
//! The pipeline is: discover variant directories under a results root,
//! extract one [`Record`] per numeric statistic, filter, pick one statistic
//! per metric, attach legend labels, then export a CSV and render charts.

#[macro_use]
extern crate logger;

pub mod catalog;
pub mod config;
mod error;
pub mod export;
pub mod extract;
mod legend;
mod record;
pub mod render;
pub mod table;

pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::legend::{LegendFormat, DEFAULT_LEGEND_FORMAT};
pub use crate::record::{LabeledRecord, Record};
pub use crate::table::{Filter, LabeledTable, Table};

use crate::render::Renderer;

use std::path::PathBuf;

/// Paths written by a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outputs {
    pub csv: PathBuf,
    pub overview: Option<PathBuf>,
    pub figures: Vec<PathBuf>,
}

impl Outputs {
    /// Every image written, overview first.
    pub fn images(&self) -> Vec<PathBuf> {
        self.overview
            .iter()
            .chain(self.figures.iter())
            .cloned()
            .collect()
    }
}

/// Runs the whole pipeline for `config`.
pub fn run(config: &Config) -> Result<Outputs, Error> {
    let legend = LegendFormat::parse(config.legend_format())?;

    let table = Table::load(config.root(), config.filter())?;
    info!(
        "loaded {} records for {} metrics from {}",
        table.len(),
        table.metrics().len(),
        config.root().display()
    );

    let table = table.select(config.only_p95()).label(&legend);

    let out_dir = config.out_dir();
    std::fs::create_dir_all(out_dir).map_err(|source| Error::CreateDir {
        path: out_dir.to_owned(),
        source,
    })?;

    let csv = out_dir.join(export::CSV_FILENAME);
    export::write_csv(&csv, &table)?;
    info!("CSV: {}", csv.display());

    let renderer = Renderer::new(&table, config.experiment(), config.logx());

    let overview = renderer.overview(out_dir)?;
    if let Some(path) = &overview {
        info!("overview: {}", path.display());
    }

    let figures = if config.skip_individual() {
        Vec::new()
    } else {
        renderer.figures(out_dir)?
    };

    let outputs = Outputs {
        csv,
        overview,
        figures,
    };

    if config.show() {
        render::show(&outputs.images());
    }

    Ok(outputs)
}

// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Turns the labelled table into the overview grid and per-metric charts.

use crate::catalog::{stat_label, title, OVERVIEW_METRICS};
use crate::{Error, LabeledTable};

use linegraph::{ColourMap, GridConfig, Panel, PlotConfig, RGBColor, Series};
use regex::Regex;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

pub const OVERVIEW_FILENAME: &str = "multiplot_overview.png";
pub const OVERVIEW_CAPTION: &str = "Performance Metrics Overview";

const OVERVIEW_ROWS: usize = 2;
const OVERVIEW_COLS: usize = 4;
const OVERVIEW_LEGEND_COLUMNS: usize = 4;

/// Per-metric legends switch to two columns at this many labels.
const WIDE_LEGEND_LABELS: usize = 10;

pub struct Renderer<'a> {
    table: &'a LabeledTable,
    colours: ColourMap,
    experiment: Option<&'a str>,
    logx: bool,
}

impl<'a> Renderer<'a> {
    pub fn new(table: &'a LabeledTable, experiment: Option<&'a str>, logx: bool) -> Self {
        Self {
            table,
            colours: ColourMap::new(table.labels()),
            experiment,
            logx,
        }
    }

    fn caption(&self, caption: &str) -> String {
        match self.experiment {
            Some(experiment) => format!("{} - {}", experiment, caption),
            None => caption.to_owned(),
        }
    }

    /// One series per label, with the points that carry a concurrency.
    pub fn series(&self, metric: &str) -> Vec<Series> {
        let mut points: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
        for row in self.table.metric_rows(metric) {
            if let Some(concurrency) = row.concurrency {
                points
                    .entry(row.label.as_str())
                    .or_default()
                    .push((concurrency as f64, row.value));
            }
        }
        points
            .into_iter()
            .map(|(label, points)| Series::new(label, self.colours.get(label), points))
            .collect()
    }

    /// Writes the overview grid. Returns `None` when none of the overview
    /// metrics is in the table.
    pub fn overview(&self, out_dir: &Path) -> Result<Option<PathBuf>, Error> {
        let present = self.table.metrics();
        let metrics: Vec<&str> = OVERVIEW_METRICS
            .iter()
            .copied()
            .filter(|metric| present.contains(metric))
            .collect();
        if metrics.is_empty() {
            warn!("none of the overview metrics were found, skipping the overview");
            return Ok(None);
        }

        let panels: Vec<Panel> = metrics
            .iter()
            .map(|metric| {
                let mut config = PlotConfig::panel();
                config.caption(title(metric)).y_desc(title(metric)).logx(self.logx);
                Panel {
                    config,
                    series: self.series(metric),
                }
            })
            .collect();

        let legend: Vec<(String, RGBColor)> = panels
            .iter()
            .find(|panel| !panel.series.is_empty())
            .map(|panel| {
                let mut seen: Vec<(String, RGBColor)> = Vec::new();
                for s in &panel.series {
                    if !seen.iter().any(|(label, _)| label == &s.label) {
                        seen.push((s.label.clone(), s.colour));
                    }
                }
                seen
            })
            .unwrap_or_default();

        let path = out_dir.join(OVERVIEW_FILENAME);
        let mut grid = GridConfig::new(OVERVIEW_ROWS, OVERVIEW_COLS);
        grid.caption(self.caption(OVERVIEW_CAPTION))
            .legend_columns(OVERVIEW_LEGEND_COLUMNS);
        grid.plot(&path, &panels, &legend)
            .map_err(|e| Error::Render {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Some(path))
    }

    /// Writes one chart per metric, in metric order.
    pub fn figures(&self, out_dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut written = Vec::new();
        for metric in self.table.metrics() {
            let stat = match self.table.metric_rows(metric).next() {
                Some(row) => stat_label(&row.stat).to_owned(),
                None => continue,
            };
            let path = out_dir.join(figure_filename(metric, &stat));
            let series = self.series(metric);

            let mut config = PlotConfig::new();
            config
                .caption(self.caption(&format!("{} — {}", title(metric), stat)))
                .y_desc(title(metric))
                .logx(self.logx)
                .legend_columns(legend_columns(series.len()));
            config
                .plot(&path, &series)
                .map_err(|e| Error::Render {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            info!("figure: {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Replaces each run of characters outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_metric(metric: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("metric pattern is a valid regex"));
    pattern.replace_all(metric, "_").into_owned()
}

fn legend_columns(labels: usize) -> usize {
    if labels < WIDE_LEGEND_LABELS {
        1
    } else {
        2
    }
}

pub fn figure_filename(metric: &str, stat_label: &str) -> String {
    format!("{}_{}.png", sanitize_metric(metric), stat_label.to_lowercase())
}

/// Hands each image to the desktop's default viewer. Failures are logged and
/// otherwise ignored.
pub fn show(paths: &[PathBuf]) {
    for path in paths {
        let spawned = if cfg!(target_os = "macos") {
            Command::new("open").arg(path).spawn()
        } else if cfg!(target_os = "windows") {
            Command::new("cmd").args(&["/C", "start", ""]).arg(path).spawn()
        } else {
            Command::new("xdg-open").arg(path).spawn()
        };
        if let Err(e) = spawned {
            warn!("could not open {}: {}", path.display(), e);
        }
    }
}

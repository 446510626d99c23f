// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The record table and the pure stages applied to it: filtering,
//! statistic selection and labelling. Every stage returns a new table.

use crate::catalog::Preferred;
use crate::extract;
use crate::{Error, LabeledRecord, LegendFormat, Record};

use strum::IntoEnumIterator;

use std::collections::BTreeSet;
use std::path::Path;

/// Optional allow-lists applied while assembling the table. Empty lists do
/// not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub scenarios: Vec<String>,
    pub concurrencies: Vec<u64>,
}

impl Filter {
    pub fn accepts(&self, record: &Record) -> bool {
        let scenario_ok = self.scenarios.is_empty()
            || record
                .scenario
                .as_ref()
                .map_or(false, |s| self.scenarios.contains(s));
        let concurrency_ok = self.concurrencies.is_empty()
            || record
                .concurrency
                .map_or(false, |c| self.concurrencies.contains(&c));
        scenario_ok && concurrency_ok
    }
}

/// Parses a concurrency allow-list such as `"1,2,4,8"`.
pub fn parse_concurrencies(list: &str) -> Result<Vec<u64>, Error> {
    list.split(',')
        .map(|item| item.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidConcurrencies(list.to_owned()))
}

/// All records of a run, kept in table order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    /// Sorts the records into table order.
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by(Record::table_order);
        Self { records }
    }

    /// Reads every variant under `root` and applies `filter`. An empty result
    /// is an error.
    pub fn load(root: &Path, filter: &Filter) -> Result<Self, Error> {
        let mut records = Vec::new();
        for dir in extract::variant_dirs(root)? {
            let loaded = extract::load_variant(&dir);
            let before = records.len();
            records.extend(loaded.into_iter().filter(|r| filter.accepts(r)));
            debug!(
                "variant {}: {} records kept",
                dir.display(),
                records.len() - before
            );
        }
        if records.is_empty() {
            return Err(Error::NoData(root.to_owned()));
        }
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct metric identifiers, in table order.
    pub fn metrics(&self) -> Vec<&str> {
        let mut metrics: Vec<&str> = Vec::new();
        for record in &self.records {
            if !metrics.contains(&record.metric_base.as_str()) {
                metrics.push(&record.metric_base);
            }
        }
        metrics
    }

    /// Statistics available for `metric`, sorted.
    pub fn stats(&self, metric: &str) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter(|r| r.metric_base == metric)
            .map(|r| r.stat.as_str())
            .collect()
    }

    /// The statistic used to represent `metric`, or `None` when the metric is
    /// not in the table.
    pub fn choose_stat(&self, metric: &str, only_p95: bool) -> Option<String> {
        let available = self.stats(metric);
        let first = available.iter().next()?.to_string();

        let chosen = if only_p95 {
            let p95: &'static str = Preferred::P95.into();
            if available.contains(p95) {
                Some(p95.to_owned())
            } else {
                None
            }
        } else {
            Preferred::iter()
                .map(<&'static str>::from)
                .find(|stat| available.contains(*stat))
                .map(str::to_owned)
        };

        Some(chosen.unwrap_or(first))
    }

    /// Keeps one statistic per metric, chosen independently for each metric.
    pub fn select(&self, only_p95: bool) -> Table {
        let mut chosen = Vec::new();
        for metric in self.metrics() {
            if let Some(stat) = self.choose_stat(metric, only_p95) {
                debug!("{}: using {}", metric, stat);
                chosen.push((metric, stat));
            }
        }

        let records = self
            .records
            .iter()
            .filter(|r| {
                chosen
                    .iter()
                    .any(|(metric, stat)| r.metric_base == *metric && r.stat == *stat)
            })
            .cloned()
            .collect();

        Table { records }
    }

    /// Attaches a legend label to every record.
    pub fn label(&self, format: &LegendFormat) -> LabeledTable {
        let rows = self
            .records
            .iter()
            .map(|r| {
                let label = format.render(&r.platform_label, r.scenario.as_deref());
                LabeledRecord::new(r.clone(), label)
            })
            .collect();
        LabeledTable { rows }
    }
}

/// The selected table with labels, ready for export and rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabeledTable {
    rows: Vec<LabeledRecord>,
}

impl LabeledTable {
    pub fn new(rows: Vec<LabeledRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[LabeledRecord] {
        &self.rows
    }

    /// Distinct metric identifiers, in row order.
    pub fn metrics(&self) -> Vec<&str> {
        let mut metrics: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !metrics.contains(&row.metric_base.as_str()) {
                metrics.push(&row.metric_base);
            }
        }
        metrics
    }

    /// Distinct labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let labels: BTreeSet<&str> = self.rows.iter().map(|r| r.label.as_str()).collect();
        labels.into_iter().collect()
    }

    /// Rows of one metric.
    pub fn metric_rows<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = &'a LabeledRecord> {
        self.rows.iter().filter(move |r| r.metric_base == metric)
    }

    /// Rows sorted by metric, platform, scenario and concurrency.
    pub fn export_rows(&self) -> Vec<&LabeledRecord> {
        let mut rows: Vec<&LabeledRecord> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.export_order(b));
        rows
    }
}

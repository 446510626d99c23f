// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde_derive::*;

use std::cmp::Ordering;

/// Compares optional keys with absent values sorting after present ones.
fn absent_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    (a.is_none(), a).cmp(&(b.is_none(), b))
}

/// A single measurement: one statistic of one metric for one variant,
/// scenario and concurrency level.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub platform_label: String,
    pub scenario: Option<String>,
    pub metric_base: String,
    pub stat: String,
    pub concurrency: Option<u64>,
    pub value: f64,
}

impl Record {
    /// Ordering used for the assembled table: metric, statistic, platform,
    /// scenario, concurrency. Absent values sort last.
    pub fn table_order(&self, other: &Self) -> Ordering {
        self.metric_base
            .cmp(&other.metric_base)
            .then_with(|| self.stat.cmp(&other.stat))
            .then_with(|| self.platform_label.cmp(&other.platform_label))
            .then_with(|| absent_last(&self.scenario, &other.scenario))
            .then_with(|| absent_last(&self.concurrency, &other.concurrency))
    }
}

/// A record with its rendered legend label. This is also the row format of
/// the exported CSV, column order included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub platform_label: String,
    pub scenario: Option<String>,
    pub metric_base: String,
    pub stat: String,
    pub concurrency: Option<u64>,
    pub value: f64,
    pub label: String,
}

impl LabeledRecord {
    pub fn new(record: Record, label: String) -> Self {
        Self {
            platform_label: record.platform_label,
            scenario: record.scenario,
            metric_base: record.metric_base,
            stat: record.stat,
            concurrency: record.concurrency,
            value: record.value,
            label,
        }
    }

    /// Ordering used for the export: metric, platform, scenario, concurrency.
    /// Absent values sort last.
    pub fn export_order(&self, other: &Self) -> Ordering {
        self.metric_base
            .cmp(&other.metric_base)
            .then_with(|| self.platform_label.cmp(&other.platform_label))
            .then_with(|| absent_last(&self.scenario, &other.scenario))
            .then_with(|| absent_last(&self.concurrency, &other.concurrency))
    }
}

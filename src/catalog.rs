// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fixed lookup tables: which scalar aggregates to pick up, which metrics
//! make the overview, and how metrics are titled on charts.

use strum_macros::{AsRefStr, EnumIter, IntoStaticStr};

/// Statistics in order of preference when picking one per metric.
#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, EnumIter, IntoStaticStr)]
pub enum Preferred {
    #[strum(serialize = "p95")]
    P95,
    #[strum(serialize = "mean")]
    Mean,
    #[strum(serialize = "value")]
    Value,
}

/// Scalar fields of `aggregated_metrics` recorded with statistic `mean`.
pub const MEAN_AGGREGATES: &[&str] = &[
    "mean_output_throughput_tokens_per_s",
    "mean_input_throughput_tokens_per_s",
    "mean_total_tokens_throughput_tokens_per_s",
    "mean_total_chars_per_hour",
    "requests_per_second",
];

/// Scalar fields of `aggregated_metrics` recorded with statistic `value`.
pub const VALUE_AGGREGATES: &[&str] = &["error_rate", "num_completed_requests"];

/// Panels of the overview figure, in display order.
pub const OVERVIEW_METRICS: &[&str] = &[
    "e2e_latency",
    "ttft",
    "tpot",
    "requests_per_second",
    "output_latency",
    "output_inference_speed",
    "mean_total_tokens_throughput_tokens_per_s",
    "mean_output_throughput_tokens_per_s",
];

const TITLES: &[(&str, &str)] = &[
    ("ttft", "Time To First Token (TTFT) [s]"),
    ("e2e_latency", "End-to-end latency (s)"),
    ("output_throughput", "Output throughput (tokens/s)"),
    ("output_inference_speed", "Output inference speed (tokens/s)"),
    ("num_completed_requests", "Completed requests"),
    ("error_rate", "Error rate"),
    ("num_input_tokens", "Input tokens"),
    ("num_output_tokens", "Output tokens"),
    ("total_tokens", "Total tokens"),
    ("input_throughput", "Input throughput (tokens/s)"),
    ("output_latency", "Output Latency (s)"),
    (
        "mean_output_throughput_tokens_per_s",
        "Mean Output Throughput (tokens/s)",
    ),
    (
        "mean_input_throughput_tokens_per_s",
        "Mean Input Throughput (tokens/s)",
    ),
    (
        "mean_total_tokens_throughput_tokens_per_s",
        "Mean Total Tokens Throughput (tokens/s)",
    ),
    ("mean_total_chars_per_hour", "Mean Total Chars per Hour"),
    ("requests_per_second", "Requests per Second"),
    ("tpot", "Time Per Output Token (TPOT) [s]"),
];

/// Display title for a metric, or the raw identifier when it is unknown.
pub fn title(metric: &str) -> &str {
    TITLES
        .iter()
        .find(|(id, _)| *id == metric)
        .map(|(_, title)| *title)
        .unwrap_or(metric)
}

/// How a statistic is named in chart titles and figure file names.
pub fn stat_label(stat: &str) -> &str {
    match stat {
        "p95" => "P95",
        "mean" => "Mean",
        other => other,
    }
}

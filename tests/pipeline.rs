// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use benchplot::export::{read_csv, CSV_FILENAME};
use benchplot::render::OVERVIEW_FILENAME;
use benchplot::*;

use std::fs;
use std::path::Path;

fn write_result(root: &Path, variant: &str, file: &str, body: &str) {
    let dir = root.join(variant);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), body).unwrap();
}

fn result(scenario: &str, concurrency: u64, ttft: f64, e2e: f64, rps: f64) -> String {
    format!(
        r#"{{
            "aggregated_metrics": {{
                "scenario": "{}",
                "num_concurrency": {},
                "stats": {{
                    "ttft": {{"p50": {}, "p95": {}, "mean": {}}},
                    "e2e_latency": {{"p95": {}, "p99": {}}}
                }},
                "requests_per_second": {},
                "error_rate": 0.0
            }},
            "individual_request_metrics": []
        }}"#,
        scenario,
        concurrency,
        ttft / 2.0,
        ttft,
        ttft * 0.8,
        e2e,
        e2e * 1.5,
        rps
    )
}

fn results_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    for (variant, scale) in &[("vllm", 1.0), ("sglang", 0.9)] {
        for concurrency in &[1u64, 2, 4, 8] {
            let c = *concurrency as f64;
            write_result(
                root.path(),
                variant,
                &format!("chat_concurrency_{}_run.json", concurrency),
                &result("chat", *concurrency, 0.1 * c * scale, 2.0 * c * scale, 5.0 * c),
            );
        }
    }
    write_result(root.path(), "vllm", "broken.json", "{\"aggregated_metrics\": ");
    root
}

fn config(root: &Path, out: &Path) -> Config {
    let mut config = Config::default();
    config.set_root(root).set_out_dir(out);
    config
}

#[test]
fn single_file_example() {
    let root = tempfile::tempdir().unwrap();
    write_result(
        root.path(),
        "variantA",
        "run_concurrency_8_x.json",
        r#"{"aggregated_metrics": {"stats": {"ttft": {"p95": 0.42}}}}"#,
    );

    let table = Table::load(root.path(), &Filter::default()).unwrap();
    assert_eq!(
        table.records(),
        &[Record {
            platform_label: "variantA".to_owned(),
            scenario: None,
            metric_base: "ttft".to_owned(),
            stat: "p95".to_owned(),
            concurrency: Some(8),
            value: 0.42,
        }]
    );
}

#[test]
fn empty_root_has_no_data() {
    let root = tempfile::tempdir().unwrap();
    match Table::load(root.path(), &Filter::default()) {
        Err(Error::NoData(path)) => assert_eq!(path, root.path()),
        other => panic!("unexpected result: {:?}", other),
    }

    let out = tempfile::tempdir().unwrap();
    let err = run(&config(root.path(), out.path())).unwrap_err();
    assert!(err.to_string().starts_with("no numeric data found"));
}

#[test]
fn unusable_files_have_no_data() {
    let root = tempfile::tempdir().unwrap();
    write_result(root.path(), "vllm", "broken_concurrency_1_.json", "{\"aggregated_metrics\": ");
    write_result(root.path(), "vllm", "list.json", "[1, 2, 3]");
    write_result(
        root.path(),
        "sglang",
        "text_concurrency_2_.json",
        r#"{"aggregated_metrics": {
            "scenario": "chat",
            "stats": {"ttft": {"p95": "fast", "raw": "[0.1, 0.2]", "mean": null}},
            "requests_per_second": "{}",
            "error_rate": ""
        }}"#,
    );
    write_result(root.path(), "sglang", "notes.txt", "1.0");

    match Table::load(root.path(), &Filter::default()) {
        Err(Error::NoData(path)) => assert_eq!(path, root.path()),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn missing_scenario_sorts_last_and_labels_none() {
    let root = tempfile::tempdir().unwrap();
    write_result(
        root.path(),
        "vllm",
        "a_concurrency_1_.json",
        r#"{"aggregated_metrics": {"stats": {"ttft": {"p95": 0.1}}}}"#,
    );
    write_result(
        root.path(),
        "vllm",
        "b_concurrency_2_.json",
        r#"{"aggregated_metrics": {"scenario": "chat", "stats": {"ttft": {"p95": 0.2}}}}"#,
    );

    let table = Table::load(root.path(), &Filter::default())
        .unwrap()
        .select(false)
        .label(&LegendFormat::default());
    let labels: Vec<&str> = table.export_rows().iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["vllm-chat", "vllm-None"]);
}

#[test]
fn concurrency_filter() {
    let root = results_root();
    let filter = Filter {
        scenarios: Vec::new(),
        concurrencies: table::parse_concurrencies("1,4").unwrap(),
    };
    let table = Table::load(root.path(), &filter).unwrap();
    assert!(!table.is_empty());
    assert!(table
        .records()
        .iter()
        .all(|r| r.concurrency == Some(1) || r.concurrency == Some(4)));
}

#[test]
fn scenario_filter_without_matches() {
    let root = results_root();
    let filter = Filter {
        scenarios: vec!["rag".to_owned()],
        concurrencies: Vec::new(),
    };
    assert!(matches!(
        Table::load(root.path(), &filter),
        Err(Error::NoData(_))
    ));
}

#[test]
fn bad_legend_format_fails_before_output() {
    let root = results_root();
    let out = tempfile::tempdir().unwrap();
    let out_dir = out.path().join("figures");
    let mut config = config(root.path(), &out_dir);
    config.set_legend_format("{platform}-{model}");

    assert!(matches!(run(&config), Err(Error::LegendFormat { .. })));
    assert!(!out_dir.exists());
}

#[test]
fn full_run() {
    let root = results_root();
    let out = tempfile::tempdir().unwrap();
    let out_dir = out.path().join("figures_multi");
    let mut config = config(root.path(), &out_dir);
    config.set_experiment(Some("nightly".to_owned()));

    let outputs = run(&config).unwrap();

    assert_eq!(outputs.csv, out_dir.join(CSV_FILENAME));
    assert_eq!(outputs.overview, Some(out_dir.join(OVERVIEW_FILENAME)));
    for image in outputs.images() {
        assert!(image.exists(), "{} missing", image.display());
    }
    let names: Vec<String> = outputs
        .figures
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "e2e_latency_p95.png",
            "error_rate_value.png",
            "requests_per_second_mean.png",
            "ttft_p95.png",
        ]
    );

    let rows = read_csv(&outputs.csv).unwrap();
    assert_eq!(rows.len(), 4 * 2 * 4);
    let ttft: Vec<&LabeledRecord> = rows
        .iter()
        .filter(|r| r.metric_base == "ttft" && r.platform_label == "vllm")
        .collect();
    assert_eq!(ttft.len(), 4);
    assert!(ttft.iter().all(|r| r.stat == "p95" && r.label == "vllm-chat"));
    assert_eq!(
        ttft.iter().map(|r| r.concurrency).collect::<Vec<_>>(),
        vec![Some(1), Some(2), Some(4), Some(8)]
    );
}

#[test]
fn only_p95_and_skip_individual() {
    let root = results_root();
    let out = tempfile::tempdir().unwrap();
    let mut config = config(root.path(), out.path());
    config.set_only_p95(true).set_skip_individual(true);

    let outputs = run(&config).unwrap();
    assert!(outputs.figures.is_empty());
    assert!(outputs.overview.is_some());

    let rows = read_csv(&outputs.csv).unwrap();
    let stat = |metric: &str| {
        rows.iter()
            .find(|r| r.metric_base == metric)
            .map(|r| r.stat.clone())
    };
    assert_eq!(stat("ttft").as_deref(), Some("p95"));
    // no p95 for these, so the alphabetical first wins
    assert_eq!(stat("requests_per_second").as_deref(), Some("mean"));
    assert_eq!(stat("error_rate").as_deref(), Some("value"));
}

#[test]
fn csv_round_trip_is_exact() {
    let root = results_root();
    let out = tempfile::tempdir().unwrap();
    let outputs = run(&config(root.path(), out.path())).unwrap();

    let table = Table::load(root.path(), &Filter::default())
        .unwrap()
        .select(false)
        .label(&LegendFormat::default());
    let expected: Vec<LabeledRecord> = table.export_rows().into_iter().cloned().collect();

    let rows = read_csv(&outputs.csv).unwrap();
    assert_eq!(rows.len(), expected.len());
    for (row, expected) in rows.iter().zip(expected.iter()) {
        assert_eq!(row.metric_base, expected.metric_base);
        assert_eq!(row.platform_label, expected.platform_label);
        assert_eq!(row.scenario, expected.scenario);
        assert_eq!(row.concurrency, expected.concurrency);
        assert_eq!(row.value.to_bits(), expected.value.to_bits());
    }
}

// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Command line parsing and the optional TOML configuration file.
//!
//! Values given on the command line take precedence over the file. Switches
//! such as `--logx` are enabled when either source enables them.

use crate::legend::DEFAULT_LEGEND_FORMAT;
use crate::table::{parse_concurrencies, Filter};
use crate::Error;

use clap::{App, Arg, ArgMatches};
use logger::Level;
use regex::Regex;
use serde_derive::*;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_ROOT: &str = "results";
pub const DEFAULT_OUT_DIR: &str = "figures_multi";
pub const EXPERIMENT_DIR: &str = "figures";

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    general: General,
    #[serde(default)]
    filter: FilterSection,
    #[serde(default)]
    plot: Plot,
}

impl ConfigFile {
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn filter(&self) -> &FilterSection {
        &self.filter
    }

    pub fn plot(&self) -> &Plot {
        &self.plot
    }
}

fn default_logging() -> String {
    "info".to_owned()
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct General {
    root: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    experiment: Option<String>,
    #[serde(default = "default_logging")]
    logging: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            root: None,
            out_dir: None,
            experiment: None,
            logging: default_logging(),
        }
    }
}

impl General {
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn out_dir(&self) -> Option<&Path> {
        self.out_dir.as_deref()
    }

    pub fn experiment(&self) -> Option<&str> {
        self.experiment.as_deref()
    }

    pub fn logging(&self) -> &str {
        &self.logging
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct FilterSection {
    #[serde(default)]
    scenarios: Vec<String>,
    #[serde(default)]
    concurrencies: Vec<u64>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct Plot {
    legend_format: Option<String>,
    #[serde(default)]
    logx: bool,
    #[serde(default)]
    show: bool,
    #[serde(default)]
    only_p95: bool,
    #[serde(default)]
    skip_individual: bool,
}

impl Plot {
    pub fn legend_format(&self) -> Option<&str> {
        self.legend_format.as_deref()
    }
}

/// Fully resolved settings for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    root: PathBuf,
    filter: Filter,
    legend_format: String,
    out_dir: PathBuf,
    experiment: Option<String>,
    logx: bool,
    show: bool,
    only_p95: bool,
    skip_individual: bool,
    log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            filter: Filter::default(),
            legend_format: DEFAULT_LEGEND_FORMAT.to_owned(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            experiment: None,
            logx: false,
            show: false,
            only_p95: false,
            skip_individual: false,
            log_level: Level::Info,
        }
    }
}

fn app() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author("Brian Martin <bmartin@twitter.com>")
        .about("Compare benchmark results across variants, scenarios and concurrency levels")
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("root")
                .long("root")
                .value_name("PATH")
                .help("directory holding one subdirectory per variant")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("scenarios")
                .long("scenarios")
                .value_name("NAME")
                .help("only include these scenarios")
                .takes_value(true)
                .multiple(true)
                .min_values(0),
        )
        .arg(
            Arg::with_name("concurrencies")
                .long("concurrencies")
                .value_name("LIST")
                .help("only include these concurrency levels, e.g. '1,2,4,8'")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("legend-format")
                .long("legend-format")
                .value_name("TEMPLATE")
                .help("legend label template using {platform} and {scenario}")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("out-dir")
                .long("out-dir")
                .value_name("PATH")
                .help("output directory for the CSV and figures")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("experiment")
                .long("experiment")
                .value_name("NAME")
                .help("experiment name, used in titles and as figures/<NAME>")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("logx")
                .long("logx")
                .help("log2 concurrency axis"),
        )
        .arg(
            Arg::with_name("show")
                .long("show")
                .help("open the written images"),
        )
        .arg(
            Arg::with_name("only-p95")
                .long("only-p95")
                .help("use p95 for every metric that has it"),
        )
        .arg(
            Arg::with_name("skip-individual")
                .long("skip-individual")
                .help("only write the overview and the CSV"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("raise log verbosity, may be repeated"),
        )
}

impl Config {
    /// Parses the process arguments.
    pub fn new() -> Result<Self, Error> {
        Self::from_args(std::env::args_os())
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from(args);
        let file = match matches.value_of("config") {
            Some(path) => ConfigFile::load_from_file(Path::new(path))?,
            None => ConfigFile::default(),
        };
        Self::merge(&matches, &file)
    }

    fn merge(matches: &ArgMatches, file: &ConfigFile) -> Result<Self, Error> {
        let defaults = Config::default();

        let root = matches
            .value_of("root")
            .map(PathBuf::from)
            .or_else(|| file.general().root().map(Path::to_owned))
            .unwrap_or(defaults.root);

        let scenarios: Vec<String> = matches
            .values_of("scenarios")
            .map(|values| values.map(str::to_owned).collect())
            .unwrap_or_default();
        let scenarios = if scenarios.is_empty() {
            file.filter().scenarios.clone()
        } else {
            scenarios
        };

        let concurrencies = match non_empty(matches.value_of("concurrencies")) {
            Some(list) => parse_concurrencies(list)?,
            None => file.filter().concurrencies.clone(),
        };

        let legend_format = matches
            .value_of("legend-format")
            .or_else(|| file.plot().legend_format())
            .unwrap_or(DEFAULT_LEGEND_FORMAT)
            .to_owned();

        let experiment = non_empty(matches.value_of("experiment"))
            .or_else(|| non_empty(file.general().experiment()))
            .map(str::to_owned);

        let out_dir = match &experiment {
            Some(name) => Path::new(EXPERIMENT_DIR).join(sanitize_experiment(name)),
            None => matches
                .value_of("out-dir")
                .map(PathBuf::from)
                .or_else(|| file.general().out_dir().map(Path::to_owned))
                .unwrap_or(defaults.out_dir),
        };

        let logging = file.general().logging();
        let base = Level::from_str(logging).map_err(|_| Error::Config {
            path: matches.value_of("config").map(PathBuf::from).unwrap_or_default(),
            reason: format!("unknown logging level '{}'", logging),
        })?;
        let log_level = logger::level_from_verbosity(base, matches.occurrences_of("verbose"));

        let plot = file.plot();
        Ok(Self {
            root,
            filter: Filter {
                scenarios,
                concurrencies,
            },
            legend_format,
            out_dir,
            experiment,
            logx: matches.is_present("logx") || plot.logx,
            show: matches.is_present("show") || plot.show,
            only_p95: matches.is_present("only-p95") || plot.only_p95,
            skip_individual: matches.is_present("skip-individual") || plot.skip_individual,
            log_level,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn legend_format(&self) -> &str {
        &self.legend_format
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn experiment(&self) -> Option<&str> {
        self.experiment.as_deref()
    }

    pub fn logx(&self) -> bool {
        self.logx
    }

    pub fn show(&self) -> bool {
        self.show
    }

    pub fn only_p95(&self) -> bool {
        self.only_p95
    }

    pub fn skip_individual(&self) -> bool {
        self.skip_individual
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.root = root.into();
        self
    }

    pub fn set_out_dir(&mut self, out_dir: impl Into<PathBuf>) -> &mut Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = filter;
        self
    }

    pub fn set_legend_format(&mut self, template: impl Into<String>) -> &mut Self {
        self.legend_format = template.into();
        self
    }

    pub fn set_experiment(&mut self, experiment: Option<String>) -> &mut Self {
        self.experiment = experiment;
        self
    }

    pub fn set_only_p95(&mut self, only_p95: bool) -> &mut Self {
        self.only_p95 = only_p95;
        self
    }

    pub fn set_skip_individual(&mut self, skip: bool) -> &mut Self {
        self.skip_individual = skip;
        self
    }
}

/// Treats an empty value the same as an absent one.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Makes an experiment name safe to use as a directory name.
pub fn sanitize_experiment(name: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9_\-\s]+").expect("experiment pattern is a valid regex")
    });
    pattern.replace_all(name, "_").trim().to_owned()
}

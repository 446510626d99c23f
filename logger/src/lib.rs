// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A small line-oriented logger for the `log` facade.
//!
//! Messages are written to stdout as
//! `YYYY-MM-DD HH:MM:SS.mmm LEVEL [label] message`. At debug and trace levels
//! the label is replaced by the module path of the call site.

#[doc(hidden)]
pub use log;

pub use log::{Level, LevelFilter, SetLoggerError};

use log::{Log, Metadata, Record};

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log::trace!($($arg)*) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log::debug!($($arg)*) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log::info!($($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log::warn!($($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log::error!($($arg)*) };
}

/// Logs at error level, flushes, and terminates the process with status 1.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
        $crate::log::Log::flush($crate::log::logger());
        std::process::exit(1);
    }};
}

pub struct Logger {
    label: String,
    level: Level,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self {
            label: env!("CARGO_PKG_NAME").to_owned(),
            level: Level::Info,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Installs this logger as the global `log` implementation.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let filter = self.level.to_level_filter();
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(filter);
        Ok(())
    }

    fn format(&self, record: &Record) -> String {
        let target = if record.level() >= Level::Debug {
            record.target()
        } else {
            self.label.as_str()
        };
        format!(
            "{} {:<5} [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            target,
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{}", self.format(record));
        }
    }

    fn flush(&self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// Maps a stacking verbosity count onto a level, starting from `base`.
pub fn level_from_verbosity(base: Level, verbosity: u64) -> Level {
    match (base as usize).saturating_add(verbosity as usize) {
        1 => Level::Error,
        2 => Level::Warn,
        3 => Level::Info,
        4 => Level::Debug,
        _ => Level::Trace,
    }
}

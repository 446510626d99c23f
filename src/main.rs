// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#[macro_use]
extern crate logger;

use benchplot::Config;
use logger::Logger;

fn main() {
    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = Logger::new().level(config.log_level()).init() {
        eprintln!("failed to initialize logger: {}", e);
        std::process::exit(1);
    }

    debug!("{:?}", config);

    if let Err(e) = benchplot::run(&config) {
        fatal!("{}", e);
    }
}

// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{Error, LabeledRecord, LabeledTable};

use std::path::Path;

pub const CSV_FILENAME: &str = "metrics_selected_multi.csv";

/// Writes the labelled table in export order, with a header row.
pub fn write_csv(path: &Path, table: &LabeledTable) -> Result<(), Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in table.export_rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads back a file written by [`write_csv`].
pub fn read_csv(path: &Path) -> Result<Vec<LabeledRecord>, Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

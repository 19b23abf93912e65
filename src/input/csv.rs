use anyhow::{Context, Result};
use crate::core::{Dataset, SampleTable};
use std::path::Path;
use tracing::{debug, info};

/// Header names recognised as a time column. Time columns are skipped since
/// sample times follow from the sample rate.
const TIME_COLUMNS: &[&str] = &["time", "timestamp", "t", "ts", "time(s)"];

/// Load a multichannel recording from a CSV file
///
/// The header row names the channels; every other row holds one sample per
/// channel. An optional time column is ignored.
pub fn load_csv(path: &Path, sample_rate: u32) -> Result<SampleTable> {
    let rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let table = read_table(rdr, sample_rate)?;

    info!(
        "Loaded {} samples x {} channels from {}",
        table.len(),
        table.channel_count(),
        path.display()
    );
    Ok(table)
}

/// Read a table from any CSV source
pub fn read_table<R: std::io::Read>(mut rdr: csv::Reader<R>, sample_rate: u32) -> Result<SampleTable> {
    let headers = rdr.headers()?.clone();
    let time_idx = find_time_column(&headers);

    let channels: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != time_idx)
        .map(|(_, name)| name.trim().to_string())
        .collect();

    if let Some(idx) = time_idx {
        debug!("Skipping time column {:?}", &headers[idx]);
    }

    let mut table = SampleTable::new(channels, sample_rate).context("CSV file has no channel columns")?;
    let mut row = Vec::with_capacity(headers.len());

    for (line, result) in rdr.records().enumerate() {
        // header is line 1
        let line = line + 2;
        let record = result.with_context(|| format!("Failed to read CSV row {}", line))?;

        row.clear();
        for (idx, cell) in record.iter().enumerate() {
            if Some(idx) == time_idx {
                continue;
            }
            let value = cell
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid sample {:?} in row {}, column {}", cell, line, idx + 1))?;
            row.push(value);
        }

        table
            .push_row(&row)
            .with_context(|| format!("Malformed CSV row {}", line))?;
    }

    Ok(table)
}

fn find_time_column(headers: &csv::StringRecord) -> Option<usize> {
    headers.iter().position(|header| {
        let header_lower = header.trim().to_lowercase();
        TIME_COLUMNS.iter().any(|&name| header_lower == name)
    })
}

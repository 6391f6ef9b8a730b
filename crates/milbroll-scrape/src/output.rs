// CSV output: rolling-window leaderboard, full-season roster, diagnostics.
//
// Each file is fully overwritten per run. Rows are heterogeneous string maps,
// so the header is the fixed leading columns followed by every other key in
// first-seen order; cells a row lacks are written empty.

use std::collections::HashSet;
use std::path::Path;

use milbroll_core::model::{
    ErrorRecord, PlayerId, StatRow, SummaryRecord, Timeframe, COL_ERROR, IDENTITY_COLUMNS,
};
use thiserror::Error;
use tracing::info;

use crate::roster::{row_to_stat_row, RosterRow};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// Keep the first record for each (player id, timeframe).
pub fn dedup_summaries(records: Vec<SummaryRecord>) -> Vec<SummaryRecord> {
    let mut seen: HashSet<(PlayerId, Timeframe)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.player_id.clone(), r.timeframe)))
        .collect()
}

/// Header: `fixed` first, then remaining keys across `rows` in first-seen order.
pub fn header(fixed: &[&str], rows: &[StatRow]) -> Vec<String> {
    let mut columns: Vec<String> = fixed.iter().map(|c| c.to_string()).collect();
    let mut seen: HashSet<String> = columns.iter().cloned().collect();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.to_string()) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

fn write_table(path: &Path, fixed: &[&str], rows: &[StatRow]) -> Result<(), OutputError> {
    let display = path.display().to_string();
    let io_err = |source: std::io::Error| OutputError::Io {
        path: display.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let columns = header(fixed, rows);
    if columns.is_empty() {
        std::fs::File::create(path).map_err(io_err)?;
        return Ok(());
    }

    let csv_err = |source: csv::Error| OutputError::Csv {
        path: display.clone(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(&columns).map_err(csv_err)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Write the rolling-window leaderboard. Duplicate (player id, timeframe)
/// records are dropped first; returns the number of rows written.
pub fn write_leaderboard(path: &Path, records: Vec<SummaryRecord>) -> Result<usize, OutputError> {
    let records = dedup_summaries(records);
    let rows: Vec<StatRow> = records.iter().map(SummaryRecord::to_row).collect();
    write_table(path, &IDENTITY_COLUMNS, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote leaderboard");
    Ok(rows.len())
}

/// Write the concatenated full-season roster as returned by the API.
pub fn write_full_season(path: &Path, rows: &[RosterRow]) -> Result<usize, OutputError> {
    let rows: Vec<StatRow> = rows.iter().map(row_to_stat_row).collect();
    write_table(path, &[], &rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote full-season roster");
    Ok(rows.len())
}

/// Write the diagnostics table of failed tasks.
pub fn write_errors(path: &Path, records: &[ErrorRecord]) -> Result<usize, OutputError> {
    let rows: Vec<StatRow> = records.iter().map(ErrorRecord::to_row).collect();
    let mut fixed = IDENTITY_COLUMNS.to_vec();
    fixed.push(COL_ERROR);
    write_table(path, &fixed, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote scrape errors");
    Ok(rows.len())
}

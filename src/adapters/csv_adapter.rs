//! CSV file data adapter.
//!
//! Expects a header row with a `date` column (`YYYY-MM-DD`, optionally
//! followed by a time) and one column per field, matched by name
//! case-insensitively. Unknown columns such as `open` or `volume` are
//! ignored. Empty and `nan` cells are undefined; rows without a close are
//! dropped.

use crate::domain::bar::Bar;
use crate::domain::error::ForgeError;
use crate::domain::field::Field;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, ForgeError> {
        let bars = read_bars_file(&self.csv_path(symbol))?;
        Ok(bars
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect())
    }
}

pub fn read_bars_file(path: &Path) -> Result<Vec<Bar>, ForgeError> {
    let file = fs::File::open(path).map_err(|e| ForgeError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    read_bars(file)
}

/// Parse bars from CSV, sorted by date.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, ForgeError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| ForgeError::Data {
            reason: format!("CSV header error: {}", e),
        })?
        .clone();

    let date_col = headers
        .iter()
        .position(|h| matches!(h.trim().to_ascii_lowercase().as_str(), "date" | "timestamp"))
        .ok_or_else(|| ForgeError::Data {
            reason: "missing date column".into(),
        })?;
    let columns: Vec<(usize, Field)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| Field::from_name(h.trim()).map(|f| (i, f)))
        .collect();
    if !columns.iter().any(|(_, f)| *f == Field::Close) {
        return Err(ForgeError::Data {
            reason: "missing close column".into(),
        });
    }

    let mut bars = Vec::new();
    let mut dropped = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let line = row + 2;
        let record = result.map_err(|e| ForgeError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;

        let date = parse_date(record.get(date_col).unwrap_or_default()).ok_or_else(|| {
            ForgeError::Data {
                reason: format!(
                    "line {}: invalid date '{}'",
                    line,
                    record.get(date_col).unwrap_or_default()
                ),
            }
        })?;

        let mut bar = Bar::new(date, f64::NAN);
        for &(col, field) in &columns {
            let cell = record.get(col).unwrap_or_default();
            let value = parse_cell(cell).map_err(|_| ForgeError::Data {
                reason: format!("line {}: invalid {} value '{}'", line, field, cell),
            })?;
            bar.set(field, value);
        }

        if bar.close.is_nan() {
            dropped += 1;
            continue;
        }
        bars.push(bar);
    }

    if dropped > 0 {
        debug!(dropped, "dropped rows without a close");
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_cell(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some)
}

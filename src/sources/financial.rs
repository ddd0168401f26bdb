//! Financial ledger field mapping
//!
//! Maps the rows of a delimited ledger (such as the Financiële
//! instrumenten export) onto `(key, year, amount)` observations.

use super::delimited::{cell, read_table, Encoding};
use super::{display_name, LoadStats, RecordError, SourceResult};
use crate::models::{Observation, SeriesKey};
use std::path::Path;
use tracing::info;

/// Which columns form the series key, the year and the amount
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub key_columns: Vec<String>,
    pub year_column: String,
    pub amount_column: String,
}

/// Plausible calendar years; anything outside is a malformed cell
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Parse a year cell. Accepts `"2021"` and float renderings like `"2021.0"`.
pub fn parse_year(raw: &str) -> Result<i32, RecordError> {
    let s = raw.trim();
    let year = match s.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => match s.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.abs() < 10_000.0 => Some(v as i32),
            _ => None,
        },
    };
    match year {
        Some(year) if YEAR_RANGE.contains(&year) => Ok(year),
        _ => Err(RecordError::Invalid {
            field: "year".into(),
            value: raw.to_string(),
        }),
    }
}

/// Parse an amount cell. A lone comma is read as the decimal separator.
pub fn parse_amount(raw: &str) -> Result<f64, RecordError> {
    let s = raw.trim();
    let normalized = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RecordError::Invalid {
            field: "amount".into(),
            value: raw.to_string(),
        }),
    }
}

/// Load observations from a ledger file.
///
/// Rows with an unparseable year or amount are skipped and counted.
pub fn load_observations(
    path: &Path,
    mapping: &FieldMapping,
    delimiter: u8,
) -> SourceResult<(Vec<Observation>, LoadStats)> {
    let table = read_table(path, delimiter, Encoding::Utf8)?;
    let key_idx = mapping
        .key_columns
        .iter()
        .map(|c| table.column(c))
        .collect::<SourceResult<Vec<_>>>()?;
    let year_idx = table.column(&mapping.year_column)?;
    let amount_idx = table.column(&mapping.amount_column)?;

    let name = display_name(path);
    let mut stats = LoadStats::default();
    let mut observations = Vec::with_capacity(table.len());

    for (i, row) in table.rows().iter().enumerate() {
        let parsed = parse_year(cell(row, Some(year_idx)))
            .and_then(|y| parse_amount(cell(row, Some(amount_idx))).map(|a| (y, a)));
        match parsed {
            Ok((year, amount)) => {
                let key = SeriesKey::new(key_idx.iter().map(|&k| cell(row, Some(k)).trim()));
                observations.push(Observation::new(key, year, amount));
                stats.accept();
            }
            // Header is line 1
            Err(e) => stats.skip(&name, i + 2, &e),
        }
    }

    info!(
        "Loaded {} observations from {} ({} rows skipped)",
        stats.accepted, name, stats.skipped
    );
    Ok((observations, stats))
}

//! Core data models for registerscan
//!
//! These models are shared by the series engine, the detectors and the
//! reporters. Records produced by a detector run are immutable values: they
//! are computed once, written to output and never read back.

use std::fmt;

/// Identity of a time series: an ordered tuple of categorical fields
/// (e.g. budget name x regulation x instrument).
///
/// Missing categorical values are kept as empty strings so that keys with
/// absent components still group together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeriesKey(Vec<String>);

impl SeriesKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Component at `idx`, or the empty string when the key is shorter
    pub fn part(&self, idx: usize) -> &str {
        self.0.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" | "))
    }
}

/// A raw (key, year, amount) triple as produced by an upstream field mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub key: SeriesKey,
    pub year: i32,
    pub amount: f64,
}

impl Observation {
    pub fn new(key: SeriesKey, year: i32, amount: f64) -> Self {
        Self { key, year, amount }
    }
}

/// A year whose year-over-year growth is an outlier against the series' own
/// growth history.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthAnomaly {
    pub key: SeriesKey,
    pub year: i32,
    pub amount: f64,
    pub prev_amount: f64,
    /// Growth as a fraction (0.5 = +50%). `None` when the previous year was zero.
    pub growth: Option<f64>,
    pub abs_change: f64,
    pub z_score: f64,
    pub series_mean_growth: f64,
    pub series_std_growth: f64,
    /// Length of the reindexed, contiguous year range
    pub n_years: usize,
}

impl GrowthAnomaly {
    /// Growth expressed in percent, if defined
    pub fn growth_pct(&self) -> Option<f64> {
        self.growth.map(|g| g * 100.0)
    }
}

/// Direction of a baseline deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > 0.0 {
            Direction::Over
        } else {
            Direction::Under
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "over"),
            Direction::Under => write!(f, "under"),
        }
    }
}

/// A year whose amount deviates from the trailing rolling baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineDeviation {
    pub key: SeriesKey,
    pub year: i32,
    pub amount: f64,
    pub baseline: f64,
    /// Deviation as a fraction of the baseline
    pub deviation: f64,
    pub direction: Direction,
    pub n_years: usize,
}

impl BaselineDeviation {
    pub fn deviation_pct(&self) -> f64 {
        self.deviation * 100.0
    }
}

/// Round to a fixed number of decimals for display.
///
/// Only used when rendering; records keep full precision.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Disclaimer embedded in every narrative report
pub const DISCLAIMER: &str = "This analysis identifies statistical anomalies and patterns that may warrant \
further review. Findings represent signals, not proven wrongdoing. No accusation \
of fraud, corruption, or illegality is made or implied.";

//! Base detector trait for series detectors
//!
//! This module defines the abstraction shared by the per-series detectors:
//! - `SeriesDetector` trait that growth and baseline detection implement
//! - the default run loop: eligibility filter, per-series detection, ranking
//! - `population_mean_std`, the one statistic both detectors rely on

use crate::series::{MaterializedSeries, SeriesSet};
use std::cmp::Ordering;
use tracing::debug;

/// Trait for detectors that judge each series against its own history
///
/// Implementations only look at one [`MaterializedSeries`] at a time. The
/// default [`SeriesDetector::detect`] takes care of skipping series that are
/// too short and of ordering the combined output.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct FlatLineDetector;
///
/// impl SeriesDetector for FlatLineDetector {
///     type Record = SeriesKey;
///
///     fn name(&self) -> &'static str {
///         "FlatLineDetector"
///     }
///
///     fn description(&self) -> &'static str {
///         "Flags series that never change"
///     }
///
///     fn min_years(&self) -> usize {
///         4
///     }
///
///     fn detect_series(&self, series: &MaterializedSeries) -> Vec<SeriesKey> {
///         vec![]
///     }
///
///     fn rank(_record: &SeriesKey) -> f64 {
///         0.0
///     }
/// }
/// ```
pub trait SeriesDetector {
    /// Output record type
    type Record;

    /// Unique identifier for this detector
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Minimum number of distinct observed years a series needs
    fn min_years(&self) -> usize;

    /// Run detection on a single eligible series
    fn detect_series(&self, series: &MaterializedSeries) -> Vec<Self::Record>;

    /// Ranking value; output is sorted by this value, descending
    fn rank(record: &Self::Record) -> f64;

    /// Run detection over every eligible series and rank the results
    ///
    /// Series shorter than [`SeriesDetector::min_years`] are skipped
    /// silently. The sort is stable, so ties keep the key order of the
    /// [`SeriesSet`].
    fn detect(&self, set: &SeriesSet) -> Vec<Self::Record> {
        let mut records: Vec<Self::Record> = set
            .eligible(self.min_years())
            .flat_map(|series| self.detect_series(series))
            .collect();
        records.sort_by(|a, b| compare_desc(Self::rank(a), Self::rank(b)));
        debug!("{} produced {} records", self.name(), records.len());
        records
    }
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Mean and population standard deviation.
///
/// Returns `None` when fewer than two values are given, or when the
/// deviation is zero or not finite: such a history has no usable spread.
pub fn population_mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if !std.is_finite() || std <= 0.0 {
        return None;
    }
    Some((mean, std))
}

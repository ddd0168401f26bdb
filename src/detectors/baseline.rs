//! Baseline deviation detector
//!
//! Approximates an "expected" amount per year as the trailing mean of the
//! preceding `rolling_window` years and flags years whose actual amount
//! deviates from it by more than `deviation_threshold`.
//!
//! The baseline only ever looks at years strictly before the one being
//! judged, and needs at least two of them. Baselines below `min_baseline`
//! are skipped: near-zero references turn ordinary amounts into explosive
//! percentages.

use super::base::SeriesDetector;
use crate::models::{BaselineDeviation, Direction};
use crate::series::MaterializedSeries;

/// Minimum number of preceding years needed to form a baseline
const MIN_BASELINE_PERIODS: usize = 2;

pub struct BaselineDetector {
    deviation_threshold: f64,
    rolling_window: usize,
    min_years: usize,
    min_baseline: f64,
}

impl BaselineDetector {
    pub fn new(
        deviation_threshold: f64,
        rolling_window: usize,
        min_years: usize,
        min_baseline: f64,
    ) -> Self {
        Self {
            deviation_threshold,
            rolling_window,
            min_years,
            min_baseline,
        }
    }
}

impl Default for BaselineDetector {
    fn default() -> Self {
        Self::new(0.25, 3, 4, 1000.0)
    }
}

/// Trailing baseline for every point of a reindexed series.
///
/// Point `i` gets the mean of points `i - window .. i` (clipped at the start
/// of the range), or `None` if fewer than two preceding points exist.
pub fn trailing_baseline(points: &[(i32, f64)], window: usize) -> Vec<Option<f64>> {
    (0..points.len())
        .map(|i| {
            let start = i.saturating_sub(window);
            let preceding = &points[start..i];
            if preceding.len() < MIN_BASELINE_PERIODS {
                return None;
            }
            let sum: f64 = preceding.iter().map(|(_, a)| a).sum();
            Some(sum / preceding.len() as f64)
        })
        .collect()
}

impl SeriesDetector for BaselineDetector {
    type Record = BaselineDeviation;

    fn name(&self) -> &'static str {
        "BaselineDetector"
    }

    fn description(&self) -> &'static str {
        "Flags years deviating from the trailing rolling mean of preceding years"
    }

    fn min_years(&self) -> usize {
        self.min_years
    }

    fn detect_series(&self, series: &MaterializedSeries) -> Vec<BaselineDeviation> {
        let points = series.reindexed();
        let baselines = trailing_baseline(&points, self.rolling_window);

        let mut deviations = Vec::new();
        for ((year, amount), baseline) in points.iter().zip(baselines) {
            let Some(baseline) = baseline else {
                continue;
            };
            if baseline == 0.0 || baseline.abs() < self.min_baseline {
                continue;
            }
            let deviation = (amount - baseline) / baseline;
            if deviation.abs() <= self.deviation_threshold {
                continue;
            }
            deviations.push(BaselineDeviation {
                key: series.key().clone(),
                year: *year,
                amount: *amount,
                baseline,
                deviation,
                direction: Direction::from_deviation(deviation),
                n_years: points.len(),
            });
        }
        deviations
    }

    fn rank(record: &BaselineDeviation) -> f64 {
        record.deviation.abs()
    }
}

//! Growth anomaly detector
//!
//! Flags years whose year-over-year growth is an outlier against the series'
//! own growth history.
//!
//! How it works:
//! 1. The series is spread over its contiguous year range, gaps count as 0
//! 2. Growth for year y is `(a[y] - a[y-1]) / a[y-1]`, undefined when
//!    `a[y-1]` is not positive
//! 3. Mean and population std are taken over the defined growth values;
//!    series with fewer than two of them, or no spread, are skipped
//! 4. Years with `|z| >= z_threshold` are flagged
//!
//! Note that with n defined growth values the largest reachable |z| is
//! sqrt(n - 1), so short series can only be flagged at low thresholds.

use super::base::{population_mean_std, SeriesDetector};
use crate::models::GrowthAnomaly;
use crate::series::MaterializedSeries;

pub struct GrowthDetector {
    z_threshold: f64,
    min_years: usize,
}

impl GrowthDetector {
    pub fn new(z_threshold: f64, min_years: usize) -> Self {
        Self {
            z_threshold,
            min_years,
        }
    }
}

impl Default for GrowthDetector {
    fn default() -> Self {
        Self::new(2.0, 4)
    }
}

/// Year-over-year growth for every point of a reindexed series.
///
/// The first point never has a growth value.
pub fn yoy_growth(points: &[(i32, f64)]) -> Vec<Option<f64>> {
    let mut growth = Vec::with_capacity(points.len());
    for (i, (_, amount)) in points.iter().enumerate() {
        let g = match i.checked_sub(1).map(|p| points[p].1) {
            Some(prev) if prev > 0.0 => Some((amount - prev) / prev),
            _ => None,
        };
        growth.push(g);
    }
    growth
}

impl SeriesDetector for GrowthDetector {
    type Record = GrowthAnomaly;

    fn name(&self) -> &'static str {
        "GrowthDetector"
    }

    fn description(&self) -> &'static str {
        "Flags year-over-year growth outliers against the series' own history"
    }

    fn min_years(&self) -> usize {
        self.min_years
    }

    fn detect_series(&self, series: &MaterializedSeries) -> Vec<GrowthAnomaly> {
        let points = series.reindexed();
        let growth = yoy_growth(&points);
        let defined: Vec<f64> = growth.iter().flatten().copied().collect();

        let Some((mean, std)) = population_mean_std(&defined) else {
            return Vec::new();
        };

        let mut anomalies = Vec::new();
        for (i, g) in growth.iter().enumerate() {
            let Some(g) = *g else {
                continue;
            };
            let z = (g - mean) / std;
            if z.abs() < self.z_threshold {
                continue;
            }
            let (year, amount) = points[i];
            let prev_amount = points[i - 1].1;
            anomalies.push(GrowthAnomaly {
                key: series.key().clone(),
                year,
                amount,
                prev_amount,
                growth: Some(g),
                abs_change: amount - prev_amount,
                z_score: z,
                series_mean_growth: mean,
                series_std_growth: std,
                n_years: points.len(),
            });
        }
        anomalies
    }

    fn rank(record: &GrowthAnomaly) -> f64 {
        record.z_score.abs()
    }
}

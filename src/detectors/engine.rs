//! Series anomaly engine
//!
//! Runs growth and baseline detection over one materialized [`SeriesSet`].
//! The engine holds no state between runs; the set is only read.

use super::base::SeriesDetector;
use super::baseline::BaselineDetector;
use super::growth::GrowthDetector;
use crate::models::{BaselineDeviation, GrowthAnomaly};
use crate::series::SeriesSet;
use std::time::Instant;
use tracing::info;

/// Tuning knobs of the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Flag growth when `|z| >= z_threshold`
    pub z_threshold: f64,
    /// Flag when `|actual - baseline| / baseline > deviation_threshold`
    pub deviation_threshold: f64,
    /// Preceding years in the trailing baseline
    pub rolling_window: usize,
    /// Distinct observed years required per series
    pub min_years: usize,
    /// Baselines smaller than this are not judged
    pub min_baseline: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.0,
            deviation_threshold: 0.25,
            rolling_window: 3,
            min_years: 4,
            min_baseline: 1000.0,
        }
    }
}

/// Output of one engine run
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    /// Sorted by descending |z|
    pub growth_anomalies: Vec<GrowthAnomaly>,
    /// Sorted by descending |deviation|
    pub baseline_deviations: Vec<BaselineDeviation>,
    pub series_total: usize,
    pub series_analyzed: usize,
}

pub struct SeriesAnomalyEngine {
    growth: GrowthDetector,
    baseline: BaselineDetector,
    min_years: usize,
}

impl SeriesAnomalyEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            growth: GrowthDetector::new(config.z_threshold, config.min_years),
            baseline: BaselineDetector::new(
                config.deviation_threshold,
                config.rolling_window,
                config.min_years,
                config.min_baseline,
            ),
            min_years: config.min_years,
        }
    }

    pub fn run(&self, set: &SeriesSet) -> EngineReport {
        let start = Instant::now();
        let series_analyzed = set.eligible(self.min_years).count();

        let growth_anomalies = self.growth.detect(set);
        let baseline_deviations = self.baseline.detect(set);

        info!(
            "Series engine: {} of {} series analyzed, {} growth anomalies, {} baseline deviations in {:?}",
            series_analyzed,
            set.len(),
            growth_anomalies.len(),
            baseline_deviations.len(),
            start.elapsed()
        );

        EngineReport {
            growth_anomalies,
            baseline_deviations,
            series_total: set.len(),
            series_analyzed,
        }
    }
}

impl Default for SeriesAnomalyEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

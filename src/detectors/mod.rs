//! Anomaly detectors
//!
//! This module provides the detector framework and the detectors behind
//! each pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SeriesAnomalyEngine                       │
//! │  - Receives one immutable SeriesSet                         │
//! │  - Runs growth and baseline detection over it               │
//! │  - Returns ranked, immutable records                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SeriesDetector Trait                      │
//! │  - name(): Unique identifier                                │
//! │  - min_years(): Eligibility floor                           │
//! │  - detect_series(series): Judge one series                  │
//! │  - rank(record): Output ordering                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Detector Categories
//!
//! ## Series detectors (one series against its own history)
//! - `GrowthDetector` - Year-over-year growth z-score outliers
//! - `BaselineDetector` - Deviation from the trailing rolling mean
//!
//! ## Registry cross-reference detectors
//! - `RapidInsolvencyDetector` - Insolvent soon after registration
//! - `PhoenixDetector` - Related insolvent entities at one postcode
//! - `GhostProviderDetector` - Childcare providers with missing registrations
//!
//! ## Distribution detectors
//! - `ThresholdDetector` - Bunching of contract values below a threshold

mod base;
mod baseline;
mod engine;
mod ghost_providers;
mod growth;
mod phoenix;
mod rapid_insolvency;
mod threshold;

pub use base::{population_mean_std, SeriesDetector};
pub use baseline::{trailing_baseline, BaselineDetector};
pub use engine::{EngineConfig, EngineReport, SeriesAnomalyEngine};
pub use ghost_providers::{
    GhostProviderDetector, GhostProviderReport, InvalidAddress, StackedPostcode,
};
pub use growth::{yoy_growth, GrowthDetector};
pub use phoenix::{PhoenixDetector, PhoenixPair, PhoenixSignal};
pub use rapid_insolvency::{
    parse_publication_date, CrossReference, RapidInsolvency, RapidInsolvencyDetector,
    DEFAULT_RAPID_DAYS,
};
pub use threshold::{
    bucket_index, bucketize, concentration_anomalies, density_discontinuity, hhi, BucketCount,
    ConcentrationAnomaly, DensityTest, HhiBucket, Severity, ThresholdAnalysis, ThresholdDetector,
    ThresholdKind, BUCKET_EDGES, BUCKET_LABELS,
};

//! registerscan - anomaly signals from Dutch open government registries
//!
//! The library behind the `registerscan` CLI:
//! - [`sources`] load register extracts into typed records
//! - [`series`] and [`detectors`] find anomalies
//! - [`reporters`] write tables, summaries and the manifest

pub mod cli;
pub mod config;
pub mod detectors;
pub mod matching;
pub mod models;
pub mod reporters;
pub mod series;
pub mod sources;

//! Project-level configuration support
//!
//! Loads configuration from `registerscan.toml` or `.registerscanrc.json` in
//! the working directory, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # registerscan.toml
//!
//! [series]
//! z_threshold = 2.0
//! deviation_threshold = 0.25
//!
//! [subsidy]
//! key_columns = ["Begrotingsnaam", "Regeling", "Instrument"]
//! delimiter = ";"
//!
//! [insolvency]
//! rapid_days = 1095
//!
//! [childcare]
//! stacking_threshold = 3
//!
//! [procurement]
//! bandwidth = 0.05
//! ```

use crate::detectors::{EngineConfig, DEFAULT_RAPID_DAYS};
use crate::sources::delimited::parse_delimiter;
use crate::sources::financial::FieldMapping;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const TOML_CONFIG_FILE: &str = "registerscan.toml";
pub const JSON_CONFIG_FILE: &str = ".registerscanrc.json";

/// Project configuration loaded from registerscan.toml or similar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RegisterscanConfig {
    /// Series anomaly engine
    #[serde(default)]
    pub series: SeriesConfig,

    /// Subsidy table field mapping
    #[serde(default)]
    pub subsidy: SubsidyConfig,

    /// Insolvency cross reference
    #[serde(default)]
    pub insolvency: InsolvencyConfig,

    /// Childcare ghost-provider signals
    #[serde(default)]
    pub childcare: ChildcareConfig,

    /// Procurement threshold analysis
    #[serde(default)]
    pub procurement: ProcurementConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,

    /// Fraction of the baseline (0.25 = 25%)
    #[serde(default = "default_deviation_threshold")]
    pub deviation_threshold: f64,

    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    #[serde(default = "default_min_years")]
    pub min_years: usize,

    #[serde(default = "default_min_baseline")]
    pub min_baseline: f64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            z_threshold: default_z_threshold(),
            deviation_threshold: default_deviation_threshold(),
            rolling_window: default_rolling_window(),
            min_years: default_min_years(),
            min_baseline: default_min_baseline(),
        }
    }
}

fn default_z_threshold() -> f64 {
    2.0
}
fn default_deviation_threshold() -> f64 {
    0.25
}
fn default_rolling_window() -> usize {
    3
}
fn default_min_years() -> usize {
    4
}
fn default_min_baseline() -> f64 {
    1000.0
}

impl SeriesConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            z_threshold: self.z_threshold,
            deviation_threshold: self.deviation_threshold,
            rolling_window: self.rolling_window,
            min_years: self.min_years,
            min_baseline: self.min_baseline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsidyConfig {
    #[serde(default = "default_key_columns")]
    pub key_columns: Vec<String>,

    #[serde(default = "default_year_column")]
    pub year_column: String,

    #[serde(default = "default_amount_column")]
    pub amount_column: String,

    /// Single character, or `tab`
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for SubsidyConfig {
    fn default() -> Self {
        Self {
            key_columns: default_key_columns(),
            year_column: default_year_column(),
            amount_column: default_amount_column(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_key_columns() -> Vec<String> {
    vec![
        "Begrotingsnaam".to_string(),
        "Regeling".to_string(),
        "Instrument".to_string(),
    ]
}
fn default_year_column() -> String {
    "Begrotingsjaar".to_string()
}
fn default_amount_column() -> String {
    "Bedrag (x1000)".to_string()
}
fn default_delimiter() -> String {
    ";".to_string()
}

impl SubsidyConfig {
    pub fn field_mapping(&self) -> FieldMapping {
        FieldMapping {
            key_columns: self.key_columns.clone(),
            year_column: self.year_column.clone(),
            amount_column: self.amount_column.clone(),
        }
    }

    pub fn delimiter_byte(&self) -> anyhow::Result<u8> {
        parse_delimiter(&self.delimiter)
            .with_context(|| format!("Invalid delimiter '{}': expected one character", self.delimiter))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsolvencyConfig {
    /// Days between registration and pronouncement counted as rapid
    #[serde(default = "default_rapid_days")]
    pub rapid_days: i64,

    #[serde(default = "default_name_similarity")]
    pub name_similarity: f64,

    /// Publication type code of the bankruptcy pronouncement
    #[serde(default = "default_pronouncement_code")]
    pub pronouncement_code: String,
}

impl Default for InsolvencyConfig {
    fn default() -> Self {
        Self {
            rapid_days: default_rapid_days(),
            name_similarity: default_name_similarity(),
            pronouncement_code: default_pronouncement_code(),
        }
    }
}

fn default_rapid_days() -> i64 {
    DEFAULT_RAPID_DAYS
}
fn default_name_similarity() -> f64 {
    0.6
}
fn default_pronouncement_code() -> String {
    "1300".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildcareConfig {
    #[serde(default = "default_stacking_threshold")]
    pub stacking_threshold: usize,

    /// LRK status of a currently registered provider
    #[serde(default = "default_active_status")]
    pub active_status: String,

    /// Inner archive of the BAG extract (default: first nested .zip)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bag_inner_archive: Option<String>,
}

impl Default for ChildcareConfig {
    fn default() -> Self {
        Self {
            stacking_threshold: default_stacking_threshold(),
            active_status: default_active_status(),
            bag_inner_archive: None,
        }
    }
}

fn default_stacking_threshold() -> usize {
    3
}
fn default_active_status() -> String {
    "Ingeschreven".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementConfig {
    /// EUR
    #[serde(default = "default_services_threshold")]
    pub services_threshold: f64,

    /// EUR
    #[serde(default = "default_works_threshold")]
    pub works_threshold: f64,

    /// Half-width of the bins around the threshold on the ratio scale
    #[serde(default = "default_bandwidth")]
    pub bandwidth: f64,
}

impl Default for ProcurementConfig {
    fn default() -> Self {
        Self {
            services_threshold: default_services_threshold(),
            works_threshold: default_works_threshold(),
            bandwidth: default_bandwidth(),
        }
    }
}

fn default_services_threshold() -> f64 {
    221_000.0
}
fn default_works_threshold() -> f64 {
    5_538_000.0
}
fn default_bandwidth() -> f64 {
    0.05
}

impl RegisterscanConfig {
    /// Reject values the detectors cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.series;
        if !(s.z_threshold > 0.0) {
            bail!("series.z_threshold must be positive, got {}", s.z_threshold);
        }
        if !(s.deviation_threshold > 0.0) {
            bail!(
                "series.deviation_threshold must be positive, got {}",
                s.deviation_threshold
            );
        }
        if s.rolling_window < 2 {
            bail!("series.rolling_window must be at least 2, got {}", s.rolling_window);
        }
        if s.min_years < 2 {
            bail!("series.min_years must be at least 2, got {}", s.min_years);
        }
        if !(s.min_baseline >= 0.0) {
            bail!("series.min_baseline must not be negative, got {}", s.min_baseline);
        }

        if self.subsidy.key_columns.is_empty() {
            bail!("subsidy.key_columns must name at least one column");
        }
        self.subsidy.delimiter_byte()?;

        let i = &self.insolvency;
        if i.rapid_days <= 0 {
            bail!("insolvency.rapid_days must be positive, got {}", i.rapid_days);
        }
        if !(0.0..=1.0).contains(&i.name_similarity) {
            bail!(
                "insolvency.name_similarity must be within 0..=1, got {}",
                i.name_similarity
            );
        }

        if self.childcare.stacking_threshold < 2 {
            bail!(
                "childcare.stacking_threshold must be at least 2, got {}",
                self.childcare.stacking_threshold
            );
        }

        let p = &self.procurement;
        if !(p.services_threshold > 0.0) || !(p.works_threshold > 0.0) {
            bail!("procurement thresholds must be positive");
        }
        if !(p.bandwidth > 0.0 && p.bandwidth < 1.0) {
            bail!("procurement.bandwidth must be within (0, 1), got {}", p.bandwidth);
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from the directory, falling back to defaults.
///
/// A file that exists but fails to parse is reported and skipped.
pub fn load_config(dir: &Path) -> RegisterscanConfig {
    // Try TOML first (preferred format)
    let toml_path = dir.join(TOML_CONFIG_FILE);
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    // Try JSON
    let json_path = dir.join(JSON_CONFIG_FILE);
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No config file found, using defaults");
    RegisterscanConfig::default()
}

/// Load an explicitly named config file; any failure is an error
pub fn load_config_file(path: &Path) -> anyhow::Result<RegisterscanConfig> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let config = if is_json {
        load_json_config(path)
    } else {
        load_toml_config(path)
    };
    let config = config.with_context(|| format!("Failed to load config {}", path.display()))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn load_toml_config(path: &Path) -> anyhow::Result<RegisterscanConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RegisterscanConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<RegisterscanConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RegisterscanConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests;

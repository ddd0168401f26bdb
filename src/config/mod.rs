//! Configuration module for registerscan
//!
//! This module handles:
//! - Project-level configuration (registerscan.toml)
//! - Detector threshold overrides
//! - Input field mappings

mod project_config;

pub use project_config::{
    load_config, load_config_file, ChildcareConfig, InsolvencyConfig, ProcurementConfig,
    RegisterscanConfig, SeriesConfig, SubsidyConfig, JSON_CONFIG_FILE, TOML_CONFIG_FILE,
};

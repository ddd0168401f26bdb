//! Config command - print the effective configuration

use crate::config::{RegisterscanConfig, JSON_CONFIG_FILE, TOML_CONFIG_FILE};
use anyhow::Result;
use console::style;
use std::path::Path;

pub fn run(config: &RegisterscanConfig, explicit: Option<&Path>) -> Result<()> {
    let source = match explicit {
        Some(path) => path.display().to_string(),
        None => format!(
            "{} or {} in the working directory, else built-in defaults",
            TOML_CONFIG_FILE, JSON_CONFIG_FILE
        ),
    };
    println!("{} {}", style("# Source:").dim(), style(source).dim());
    print!("{}", config.to_toml()?);
    Ok(())
}

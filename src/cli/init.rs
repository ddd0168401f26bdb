//! Init command - write an annotated config file

use crate::config::TOML_CONFIG_FILE;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# registerscan configuration
# Every value below is the built-in default. CLI flags override these.

[series]
# Flag a year when its growth z-score reaches +/- this value
z_threshold = 2.0

# Flag a year when it deviates more than this fraction from the rolling baseline
deviation_threshold = 0.25

# Preceding years averaged into the baseline
rolling_window = 3

# Distinct observed years a series needs before it is analyzed
min_years = 4

# Baselines smaller than this are not judged
min_baseline = 1000.0

[subsidy]
# Columns forming the series key, the year and the amount
key_columns = ["Begrotingsnaam", "Regeling", "Instrument"]
year_column = "Begrotingsjaar"
amount_column = "Bedrag (x1000)"

# Field delimiter: one character, or "tab"
delimiter = ";"

[insolvency]
# Insolvent within this many days of registration counts as rapid
rapid_days = 1095

# Name similarity (0-1) that counts as a phoenix signal
name_similarity = 0.6

# Publication type code of the bankruptcy pronouncement
pronouncement_code = "1300"

[childcare]
# Active providers sharing one postcode that count as stacking
stacking_threshold = 3

# LRK status of a currently registered provider
active_status = "Ingeschreven"

# Inner archive of the BAG extract (default: first nested .zip)
# bag_inner_archive = "9999NUM08012025.zip"

[procurement]
# EU tender thresholds in EUR
services_threshold = 221000.0
works_threshold = 5538000.0

# Half-width of the bins compared around the threshold (ratio scale)
bandwidth = 0.05
"#;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }

    let config_path = path.join(TOML_CONFIG_FILE);
    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\nNext steps:");
    println!("  {} Review the effective settings", style("registerscan config").cyan());
    println!(
        "  {} Run a pipeline",
        style("registerscan subsidy-trends <input>").cyan()
    );

    Ok(())
}

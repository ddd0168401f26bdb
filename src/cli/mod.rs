//! CLI command definitions and handlers

mod ghost;
mod init;
mod insolvency;
mod show_config;
mod subsidy;
mod thresholds;

use crate::config::{load_config, load_config_file, RegisterscanConfig};
use crate::reporters::{build_manifest, print_manifest, ArtifactWriter};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};

/// registerscan - anomaly signals from Dutch open government registries
#[derive(Parser, Debug)]
#[command(name = "registerscan")]
#[command(
    version,
    about = "Cross-reference Dutch open registries and flag statistical anomalies",
    long_about = "registerscan runs four batch pipelines over Dutch open-data extracts: \
subsidy trend anomalies, rapid insolvencies and phoenix pairs, ghost childcare \
providers, and procurement threshold bunching.\n\n\
Every pipeline writes CSV tables and a Markdown summary to its output directory \
and prints a SHA-256 manifest of what it wrote. Findings are signals for review, \
not proof of wrongdoing.",
    after_help = "\
Examples:
  registerscan init                                     Write an example registerscan.toml
  registerscan subsidy-trends instruments.csv.gz        Growth and baseline anomalies
  registerscan insolvency --kvk sbi.csv.gz --insolvency cases.jsonl
  registerscan ghost-providers --lrk lrk.csv.gz --kvk sbi.csv.gz --bag bag.zip
  registerscan thresholds data/tenderned/               Threshold bunching"
)]
pub struct Cli {
    /// Config file (default: registerscan.toml or .registerscanrc.json in the working directory)
    #[arg(long, global = true, env = "REGISTERSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a registerscan.toml with every setting and its default
    Init {
        /// Directory to write the config file into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Growth anomalies and budget-vs-actual deviations in yearly spending
    #[command(after_help = "\
Examples:
  registerscan subsidy-trends instruments.csv.gz
  registerscan subsidy-trends data.csv --delimiter , --z-threshold 2.5
  registerscan subsidy-trends data.csv -o out/subsidy")]
    SubsidyTrends {
        /// Delimited table with key, year and amount columns (plain or .gz)
        input: PathBuf,

        /// Output directory
        #[arg(long, short = 'o', default_value = "output/subsidy-trends")]
        output_dir: PathBuf,

        /// Flag growth when |z| reaches this value
        #[arg(long)]
        z_threshold: Option<f64>,

        /// Flag deviations above this fraction of the baseline
        #[arg(long)]
        deviation_threshold: Option<f64>,

        /// Preceding years in the rolling baseline
        #[arg(long)]
        rolling_window: Option<usize>,

        /// Observed years a series needs to be analyzed
        #[arg(long)]
        min_years: Option<usize>,

        /// Smallest baseline that is judged
        #[arg(long)]
        min_baseline: Option<f64>,

        /// Field delimiter (one character, or "tab")
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Rapid insolvencies and phoenix pairs from KVK and insolvency records
    #[command(after_help = "\
Examples:
  registerscan insolvency --kvk sbi.csv.gz --insolvency cases.jsonl
  registerscan insolvency --kvk sbi.csv.gz --insolvency cases.jsonl --rapid-days 730")]
    Insolvency {
        /// KVK SBI table (`~`-separated, plain or .gz)
        #[arg(long)]
        kvk: PathBuf,

        /// Insolvency cases, one JSON document per line (plain or .gz)
        #[arg(long)]
        insolvency: PathBuf,

        /// Output directory
        #[arg(long, short = 'o', default_value = "output/insolvency")]
        output_dir: PathBuf,

        /// Days after registration counted as rapid
        #[arg(long)]
        rapid_days: Option<i64>,

        /// Name similarity needed for a name signal (0-1)
        #[arg(long)]
        name_similarity: Option<f64>,
    },

    /// Childcare providers with inactive KVK numbers, unknown postcodes or stacked addresses
    #[command(after_help = "\
Examples:
  registerscan ghost-providers --lrk lrk.csv.gz --kvk sbi.csv.gz --bag bag.zip
  registerscan ghost-providers --lrk lrk.csv --kvk sbi.csv --bag bag.zip --stacking-threshold 4")]
    GhostProviders {
        /// LRK register export (`;`-separated, Latin-1, plain or .gz)
        #[arg(long)]
        lrk: PathBuf,

        /// KVK SBI table; its first column is the set of known KVK numbers
        #[arg(long)]
        kvk: PathBuf,

        /// BAG extract: zip holding a zip of XML files
        #[arg(long)]
        bag: PathBuf,

        /// Output directory
        #[arg(long, short = 'o', default_value = "output/ghost-providers")]
        output_dir: PathBuf,

        /// Active providers per postcode that count as stacking
        #[arg(long)]
        stacking_threshold: Option<usize>,

        /// Inner archive of the BAG extract to scan
        #[arg(long)]
        bag_inner: Option<String>,
    },

    /// Bunching of contract values just below EU tender thresholds
    #[command(after_help = "\
Examples:
  registerscan thresholds data/tenderned/
  registerscan thresholds releases-2023.json releases-2024.json.gz --bandwidth 0.03")]
    Thresholds {
        /// Release files (.json or .json.gz) or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o', default_value = "output/thresholds")]
        output_dir: PathBuf,

        /// Services threshold in EUR
        #[arg(long)]
        services_threshold: Option<f64>,

        /// Works threshold in EUR
        #[arg(long)]
        works_threshold: Option<f64>,

        /// Bin half-width around the threshold on the ratio scale
        #[arg(long)]
        bandwidth: Option<f64>,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),

        Commands::Config => show_config::run(&effective_config(explicit)?, explicit),

        Commands::SubsidyTrends {
            input,
            output_dir,
            z_threshold,
            deviation_threshold,
            rolling_window,
            min_years,
            min_baseline,
            delimiter,
        } => {
            let mut config = effective_config(explicit)?;
            override_with(&mut config.series.z_threshold, z_threshold);
            override_with(&mut config.series.deviation_threshold, deviation_threshold);
            override_with(&mut config.series.rolling_window, rolling_window);
            override_with(&mut config.series.min_years, min_years);
            override_with(&mut config.series.min_baseline, min_baseline);
            override_with(&mut config.subsidy.delimiter, delimiter);
            config.validate()?;
            subsidy::run(&input, &output_dir, &config)
        }

        Commands::Insolvency {
            kvk,
            insolvency,
            output_dir,
            rapid_days,
            name_similarity,
        } => {
            let mut config = effective_config(explicit)?;
            override_with(&mut config.insolvency.rapid_days, rapid_days);
            override_with(&mut config.insolvency.name_similarity, name_similarity);
            config.validate()?;
            insolvency::run(&kvk, &insolvency, &output_dir, &config)
        }

        Commands::GhostProviders {
            lrk,
            kvk,
            bag,
            output_dir,
            stacking_threshold,
            bag_inner,
        } => {
            let mut config = effective_config(explicit)?;
            override_with(&mut config.childcare.stacking_threshold, stacking_threshold);
            if bag_inner.is_some() {
                config.childcare.bag_inner_archive = bag_inner;
            }
            config.validate()?;
            ghost::run(&lrk, &kvk, &bag, &output_dir, &config)
        }

        Commands::Thresholds {
            inputs,
            output_dir,
            services_threshold,
            works_threshold,
            bandwidth,
        } => {
            let mut config = effective_config(explicit)?;
            override_with(&mut config.procurement.services_threshold, services_threshold);
            override_with(&mut config.procurement.works_threshold, works_threshold);
            override_with(&mut config.procurement.bandwidth, bandwidth);
            config.validate()?;
            thresholds::run(&inputs, &output_dir, &config)
        }
    }
}

/// Explicit config file, or whatever the working directory provides
fn effective_config(explicit: Option<&Path>) -> Result<RegisterscanConfig> {
    match explicit {
        Some(path) => load_config_file(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            Ok(load_config(&cwd))
        }
    }
}

/// CLI flags win over config values
fn override_with<T>(slot: &mut T, flag: Option<T>) {
    if let Some(value) = flag {
        *slot = value;
    }
}

fn print_header(title: &str) {
    println!("\n{}", style(title).bold());
    println!("{}", style("──────────────────────────────────────").dim());
}

fn print_step(message: &str) {
    println!("{} {}", style("→").cyan(), message);
}

fn print_count(label: &str, count: usize) {
    println!("  {} {}", style(count).bold(), label);
}

/// Print where the artifacts went and their manifest
fn finish(writer: &ArtifactWriter) -> Result<()> {
    let entries = build_manifest(writer.written())?;
    println!(
        "\n{} Wrote {} files to {}",
        style("✓").green(),
        entries.len(),
        style(writer.dir().display()).cyan()
    );
    print_manifest(&entries);
    Ok(())
}

//! Output writers for pipeline artifacts
//!
//! Every pipeline writes into one output directory:
//! - CSV tables with a fixed column order
//! - a Markdown summary
//!
//! The manifest then lists every written file with its SHA-256 digest.
//! Nothing written depends on the clock, so reruns are byte-identical.

mod ghost;
mod insolvency;
mod manifest;
mod subsidy;
mod threshold;

pub use ghost::{
    invalid_address_rows, inactive_kvk_rows, render_ghost_summary, stacking_rows, write_ghost,
    GhostSummary, INACTIVE_KVK_HEADERS, INVALID_ADDRESS_HEADERS, STACKING_HEADERS,
};
pub use insolvency::{
    phoenix_rows, rapid_rows, render_insolvency_summary, write_insolvency, InsolvencySummary,
    PHOENIX_HEADERS, RAPID_HEADERS,
};
pub use manifest::{build_manifest, digest_file, print_manifest, ManifestEntry};
pub use subsidy::{
    baseline_headers, baseline_rows, growth_headers, growth_rows, key_headers,
    render_subsidy_summary, write_subsidy, SubsidySummary,
};
pub use threshold::{
    anomaly_rows, distribution_rows, hhi_rows, render_threshold_summary, write_threshold,
    ThresholdSummary, ANOMALY_HEADERS, DISTRIBUTION_HEADERS, HHI_HEADERS,
};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes artifacts into one directory and remembers what it wrote
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl ArtifactWriter {
    /// Create the output directory if needed
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Write a CSV table. The header row is always written, even with no rows.
    pub fn write_csv<I>(&mut self, name: &str, headers: &[&str], rows: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let path = self.dir.join(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer
            .write_record(headers)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let mut count = 0usize;
        for row in rows {
            writer
                .write_record(&row)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            count += 1;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Wrote {} rows to {}", count, path.display());
        self.written.push(path.clone());
        Ok(path)
    }

    /// Write a text artifact such as a Markdown summary
    pub fn write_text(&mut self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {}", path.display());
        self.written.push(path.clone());
        Ok(path)
    }
}

/// Fixed-decimal rendering for display; never prints `-0`
pub fn fmt_fixed(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value);
    if rendered.starts_with('-') && rendered[1..].chars().all(|c| c == '0' || c == '.') {
        rendered[1..].to_string()
    } else {
        rendered
    }
}

/// Like [`fmt_fixed`], empty for missing values
pub fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| fmt_fixed(v, decimals)).unwrap_or_default()
}

/// Whole units with `,` thousands separators, for narrative reports
pub fn fmt_thousands(value: f64) -> String {
    let rendered = fmt_fixed(value, 0);
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}", sign, grouped)
}

/// Integer counts with `,` thousands separators
pub fn fmt_count(value: usize) -> String {
    fmt_thousands(value as f64)
}

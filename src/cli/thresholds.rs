//! Procurement threshold command

use super::{finish, print_count, print_header, print_step};
use crate::config::RegisterscanConfig;
use crate::detectors::ThresholdDetector;
use crate::reporters::{write_threshold, ArtifactWriter, ThresholdSummary};
use crate::sources::tenderned::{collect_files, load_values};
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

pub fn run(inputs: &[PathBuf], output_dir: &Path, config: &RegisterscanConfig) -> Result<()> {
    print_header("Threshold Clustering Analysis");
    let settings = &config.procurement;

    let files = collect_files(inputs).context("No release files to read")?;
    print_step(&format!("Loading {} release files", style(files.len()).cyan()));
    let (values, stats) = load_values(&files).context("Failed to load release files")?;
    print_count("contracts with a positive award value", values.len());
    if stats.skipped > 0 {
        print_count("releases without a usable value", stats.skipped);
    }

    print_step("Analyzing value distribution against thresholds");
    let detector = ThresholdDetector::new(
        settings.services_threshold,
        settings.works_threshold,
        settings.bandwidth,
    );
    let analyses = detector.detect(&values);
    for analysis in &analyses {
        print_count(
            &format!("concentration anomalies ({})", analysis.kind),
            analysis.anomalies.len(),
        );
    }

    let mut writer = ArtifactWriter::create(output_dir)?;
    write_threshold(
        &mut writer,
        &ThresholdSummary {
            files_read: files.len(),
            values: values.len(),
            skipped: stats.skipped,
            bandwidth: settings.bandwidth,
            analyses: &analyses,
        },
    )?;
    finish(&writer)
}

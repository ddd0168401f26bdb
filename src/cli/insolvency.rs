//! Insolvency cross-reference command

use super::{finish, print_count, print_header, print_step};
use crate::config::RegisterscanConfig;
use crate::detectors::{PhoenixDetector, RapidInsolvencyDetector};
use crate::reporters::{write_insolvency, ArtifactWriter, InsolvencySummary};
use crate::sources::{insolvency, kvk};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(
    kvk_path: &Path,
    insolvency_path: &Path,
    output_dir: &Path,
    config: &RegisterscanConfig,
) -> Result<()> {
    print_header("KVK-Insolvency Cross-Reference");
    let settings = &config.insolvency;

    print_step(&format!("Loading KVK data from {}", style(kvk_path.display()).cyan()));
    let (profiles, kvk_stats) = kvk::load_profiles(kvk_path)
        .with_context(|| format!("Failed to load {}", kvk_path.display()))?;
    print_count("KVK numbers", profiles.len());
    if kvk_stats.skipped > 0 {
        print_count("short KVK lines skipped", kvk_stats.skipped);
    }

    print_step(&format!(
        "Loading insolvency records from {}",
        style(insolvency_path.display()).cyan()
    ));
    let (records, insolvency_stats) =
        insolvency::load_records(insolvency_path, &settings.pronouncement_code)
            .with_context(|| format!("Failed to load {}", insolvency_path.display()))?;
    print_count("insolvency records", records.len());
    if insolvency_stats.skipped > 0 {
        print_count("insolvency records skipped", insolvency_stats.skipped);
    }

    print_step("Detecting rapid insolvencies");
    let cross = RapidInsolvencyDetector::new(settings.rapid_days).detect(&profiles, &records);
    print_count("records matched to KVK", cross.matched);
    print_count(
        &format!("insolvent within {} days of registration", settings.rapid_days),
        cross.rapid.len(),
    );

    print_step("Detecting phoenix pairs");
    let pairs = PhoenixDetector::new(settings.name_similarity).detect(&records, &profiles);
    print_count("phoenix signal pairs", pairs.len());

    let mut writer = ArtifactWriter::create(output_dir)?;
    write_insolvency(
        &mut writer,
        &InsolvencySummary {
            insolvency_records: records.len(),
            insolvency_skipped: insolvency_stats.skipped,
            kvk_numbers: profiles.len(),
            matched: cross.matched,
            rapid_days: settings.rapid_days,
            name_threshold: settings.name_similarity,
            rapid: &cross.rapid,
            pairs: &pairs,
        },
    )?;
    finish(&writer)
}

//! Ghost childcare provider command

use super::{finish, print_count, print_header, print_step};
use crate::config::RegisterscanConfig;
use crate::detectors::GhostProviderDetector;
use crate::reporters::{write_ghost, ArtifactWriter, GhostSummary};
use crate::sources::{bag, kvk, lrk};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(
    lrk_path: &Path,
    kvk_path: &Path,
    bag_path: &Path,
    output_dir: &Path,
    config: &RegisterscanConfig,
) -> Result<()> {
    print_header("Ghost Provider Analysis");
    let settings = &config.childcare;
    let detector = GhostProviderDetector::new(settings.stacking_threshold, &settings.active_status);

    print_step(&format!("Loading LRK register from {}", style(lrk_path.display()).cyan()));
    let (providers, lrk_stats) = lrk::load_records(lrk_path)
        .with_context(|| format!("Failed to load {}", lrk_path.display()))?;
    let lrk_active = providers.iter().filter(|p| detector.is_active(p)).count();
    print_count("LRK providers", providers.len());
    print_count(&format!("with status {}", settings.active_status), lrk_active);

    print_step(&format!("Loading KVK numbers from {}", style(kvk_path.display()).cyan()));
    let (kvk_numbers, _) = kvk::load_numbers(kvk_path)
        .with_context(|| format!("Failed to load {}", kvk_path.display()))?;
    print_count("unique KVK numbers", kvk_numbers.len());

    print_step(&format!("Scanning BAG extract {}", style(bag_path.display()).cyan()));
    let postcodes = bag::load_postcodes(bag_path, settings.bag_inner_archive.as_deref())
        .with_context(|| format!("Failed to read {}", bag_path.display()))?;
    print_count("BAG postcodes", postcodes.len());

    print_step("Checking providers");
    let report = detector.detect(&providers, &kvk_numbers, &postcodes);
    print_count("inactive KVK registrations", report.inactive_kvk.len());
    print_count("postcodes not in BAG", report.invalid_addresses.len());
    print_count(
        &format!("postcodes with {}+ active providers", settings.stacking_threshold),
        report.stacking.len(),
    );

    let mut writer = ArtifactWriter::create(output_dir)?;
    write_ghost(
        &mut writer,
        &GhostSummary {
            lrk_total: providers.len(),
            lrk_active,
            lrk_skipped: lrk_stats.skipped,
            kvk_numbers: kvk_numbers.len(),
            bag_postcodes: postcodes.len(),
            bag_files: postcodes.files_scanned,
            stacking_threshold: settings.stacking_threshold,
            active_status: &settings.active_status,
            report: &report,
        },
    )?;
    finish(&writer)
}

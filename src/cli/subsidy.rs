//! Subsidy trends command

use super::{finish, print_count, print_header, print_step};
use crate::config::RegisterscanConfig;
use crate::detectors::SeriesAnomalyEngine;
use crate::reporters::{write_subsidy, ArtifactWriter, SubsidySummary};
use crate::series::SeriesSet;
use crate::sources::financial::load_observations;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(input: &Path, output_dir: &Path, config: &RegisterscanConfig) -> Result<()> {
    print_header("Subsidy Trend Analysis");

    print_step(&format!("Loading {}", style(input.display()).cyan()));
    let mapping = config.subsidy.field_mapping();
    let (observations, stats) =
        load_observations(input, &mapping, config.subsidy.delimiter_byte()?)
            .with_context(|| format!("Failed to load {}", input.display()))?;
    print_count("rows loaded", stats.accepted);
    if stats.skipped > 0 {
        print_count("rows skipped (unparseable year or amount)", stats.skipped);
    }

    print_step("Materializing series");
    let set = SeriesSet::materialize(observations);
    let yearly_totals = set.yearly_totals();

    print_step("Running growth and baseline detection");
    let engine_config = config.series.engine_config();
    let report = SeriesAnomalyEngine::new(&engine_config).run(&set);
    print_count("series", report.series_total);
    print_count("series analyzed", report.series_analyzed);
    print_count("growth anomalies", report.growth_anomalies.len());
    print_count("baseline deviations", report.baseline_deviations.len());

    let mut writer = ArtifactWriter::create(output_dir)?;
    write_subsidy(
        &mut writer,
        &SubsidySummary {
            rows_loaded: stats.accepted,
            rows_skipped: stats.skipped,
            key_columns: &config.subsidy.key_columns,
            yearly_totals: &yearly_totals,
            config: &engine_config,
            report: &report,
        },
    )?;
    finish(&writer)
}

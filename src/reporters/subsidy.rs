//! Subsidy trend artifacts
//!
//! Two tables and a narrative summary rendered from one engine run.

use super::{fmt_count, fmt_fixed, fmt_opt, fmt_thousands, ArtifactWriter};
use crate::detectors::{EngineConfig, EngineReport};
use crate::models::{BaselineDeviation, GrowthAnomaly, DISCLAIMER};
use anyhow::Result;
use std::collections::BTreeMap;

pub const GROWTH_FILE: &str = "subsidy-growth-anomalies.csv";
pub const BASELINE_FILE: &str = "budget-vs-actual-outliers.csv";
pub const SUMMARY_FILE: &str = "subsidy-trends-summary.md";

const TOP_N: usize = 10;

/// Names of the key columns for a key arity
///
/// The standard three-part key maps to budget, regulation and instrument;
/// other arities get numbered columns.
pub fn key_headers(arity: usize) -> Vec<String> {
    if arity == 3 {
        vec!["budget_name".into(), "regeling".into(), "instrument".into()]
    } else {
        (1..=arity).map(|i| format!("key_{}", i)).collect()
    }
}

pub fn growth_headers(arity: usize) -> Vec<String> {
    let mut headers = key_headers(arity);
    headers.extend(
        [
            "year",
            "amount_k",
            "prev_amount_k",
            "yoy_growth_pct",
            "abs_change_k",
            "z_score",
            "series_mean_growth_pct",
            "series_std_growth_pct",
            "n_years",
        ]
        .map(String::from),
    );
    headers
}

pub fn baseline_headers(arity: usize) -> Vec<String> {
    let mut headers = key_headers(arity);
    headers.extend(
        [
            "year",
            "amount_k",
            "baseline_k",
            "deviation_pct",
            "deviation_direction",
            "n_years",
        ]
        .map(String::from),
    );
    headers
}

pub fn growth_rows(anomalies: &[GrowthAnomaly]) -> Vec<Vec<String>> {
    anomalies
        .iter()
        .map(|a| {
            let mut row = a.key.parts().to_vec();
            row.extend([
                a.year.to_string(),
                fmt_fixed(a.amount, 0),
                fmt_fixed(a.prev_amount, 0),
                fmt_opt(a.growth_pct(), 1),
                fmt_fixed(a.abs_change, 0),
                fmt_fixed(a.z_score, 2),
                fmt_fixed(a.series_mean_growth * 100.0, 1),
                fmt_fixed(a.series_std_growth * 100.0, 1),
                a.n_years.to_string(),
            ]);
            row
        })
        .collect()
}

pub fn baseline_rows(deviations: &[BaselineDeviation]) -> Vec<Vec<String>> {
    deviations
        .iter()
        .map(|d| {
            let mut row = d.key.parts().to_vec();
            row.extend([
                d.year.to_string(),
                fmt_fixed(d.amount, 0),
                fmt_fixed(d.baseline, 0),
                fmt_fixed(d.deviation_pct(), 1),
                d.direction.to_string(),
                d.n_years.to_string(),
            ]);
            row
        })
        .collect()
}

/// Everything the narrative summary reports on
pub struct SubsidySummary<'a> {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub key_columns: &'a [String],
    pub yearly_totals: &'a BTreeMap<i32, f64>,
    pub config: &'a EngineConfig,
    pub report: &'a EngineReport,
}

pub fn render_subsidy_summary(summary: &SubsidySummary<'_>) -> String {
    let mut md = String::new();
    md.push_str(&render_header());
    md.push('\n');
    md.push_str(&render_overview(summary));
    md.push('\n');
    md.push_str(&render_methodology(summary));
    md.push('\n');
    md.push_str(&render_results(summary));
    md.push('\n');
    md.push_str(&render_limitations());
    md
}

fn render_header() -> String {
    format!(
        r#"# Subsidy Trend Analysis

> **Disclaimer:** {}
"#,
        DISCLAIMER
    )
}

fn render_overview(summary: &SubsidySummary<'_>) -> String {
    let years = match (
        summary.yearly_totals.keys().next(),
        summary.yearly_totals.keys().next_back(),
    ) {
        (Some(first), Some(last)) => format!("{}-{}", first, last),
        _ => "none".to_string(),
    };

    let mut md = format!(
        r#"## Overview

- **Rows loaded:** {}
- **Rows skipped (unparseable year or amount):** {}
- **Years covered:** {}
- **Total unique series** ({}): {}
- **Series with >= {} years of data** (analyzed): {}

### Aggregate spending by year

| Year | Total | YoY Change |
|------|-------|------------|
"#,
        fmt_count(summary.rows_loaded),
        fmt_count(summary.rows_skipped),
        years,
        summary.key_columns.join(" x "),
        fmt_count(summary.report.series_total),
        summary.config.min_years,
        fmt_count(summary.report.series_analyzed),
    );

    let mut prev: Option<f64> = None;
    for (year, total) in summary.yearly_totals {
        let change = match prev {
            Some(p) if p != 0.0 => format!("{:+.1}%", (total - p) / p * 100.0),
            _ => "n/a".to_string(),
        };
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            year,
            fmt_thousands(*total),
            change
        ));
        prev = Some(*total);
    }
    md
}

fn render_methodology(summary: &SubsidySummary<'_>) -> String {
    let config = summary.config;
    format!(
        r#"## Methodology

### Data preparation

Amounts are summed per series key and year before analysis. Each series is
then reindexed to a contiguous year range, with missing years counted as zero.

### Growth anomaly detection

For each series with >= {min_years} observed years:
1. Compute year-over-year growth where the previous year is positive
2. Calculate the series-level mean and population standard deviation of growth
3. Flag any year where the growth z-score reaches +/-{z}

Anomalies are relative to each series' own history, not a global benchmark.

### Budget-vs-actual baseline deviation

The dataset contains actual disbursements only, so a budget baseline is
approximated by the **{window}-year trailing mean** of preceding amounts. Years
deviating more than **{dev}%** from this baseline are flagged. Baselines below
{min_baseline} are not judged.
"#,
        min_years = config.min_years,
        z = config.z_threshold,
        window = config.rolling_window,
        dev = fmt_fixed(config.deviation_threshold * 100.0, 0),
        min_baseline = fmt_thousands(config.min_baseline),
    )
}

fn render_results(summary: &SubsidySummary<'_>) -> String {
    let report = summary.report;
    let config = summary.config;

    let mut md = format!(
        r#"## Results

### Growth anomalies

**{} anomalous series-years detected** (|z| >= {}).

Top signals by absolute z-score:

"#,
        fmt_count(report.growth_anomalies.len()),
        config.z_threshold
    );
    if report.growth_anomalies.is_empty() {
        md.push_str("No growth anomalies detected.\n");
    }
    for a in report.growth_anomalies.iter().take(TOP_N) {
        md.push_str(&format!(
            "- **{}**: {}, {}% YoY change (z={}, amount: {})\n",
            a.key,
            a.year,
            fmt_opt(a.growth_pct(), 1),
            fmt_fixed(a.z_score, 2),
            fmt_thousands(a.amount)
        ));
    }

    md.push_str(&format!(
        r#"
### Budget-vs-actual baseline deviations

**{} outlier series-years detected** (> {}% deviation from rolling baseline).

Top signals by absolute deviation:

"#,
        fmt_count(report.baseline_deviations.len()),
        fmt_fixed(config.deviation_threshold * 100.0, 0)
    ));
    if report.baseline_deviations.is_empty() {
        md.push_str("No baseline deviations detected.\n");
    }
    for d in report.baseline_deviations.iter().take(TOP_N) {
        md.push_str(&format!(
            "- **{}**: {}, {}% {} baseline (actual: {}, baseline: {})\n",
            d.key,
            d.year,
            fmt_fixed(d.deviation_pct(), 1),
            d.direction,
            fmt_thousands(d.amount),
            fmt_thousands(d.baseline)
        ));
    }
    md
}

fn render_limitations() -> String {
    r#"## Limitations

1. **Changes in granularity:** Years reported at different levels of aggregation can
   produce apparent growth that reflects reporting rather than spending.
2. **No budget data:** The baseline is a rolling mean of past actuals, not a
   planned allocation.
3. **Anonymized recipients:** Entity-level follow-up is limited where recipients
   are anonymized.
4. **Units:** Amounts are reported in the unit of the source column.
5. **Zero-base growth:** Years following a zero amount have no growth rate and are
   left out of the growth statistics.
"#
    .to_string()
}

/// Write both tables and the summary, in a fixed order
pub fn write_subsidy(writer: &mut ArtifactWriter, summary: &SubsidySummary<'_>) -> Result<()> {
    let arity = summary.key_columns.len();

    let headers = growth_headers(arity);
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    writer.write_csv(
        GROWTH_FILE,
        &headers,
        growth_rows(&summary.report.growth_anomalies),
    )?;

    let headers = baseline_headers(arity);
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    writer.write_csv(
        BASELINE_FILE,
        &headers,
        baseline_rows(&summary.report.baseline_deviations),
    )?;

    writer.write_text(SUMMARY_FILE, &render_subsidy_summary(summary))?;
    Ok(())
}

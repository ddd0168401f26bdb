//! Procurement threshold artifacts

use super::{fmt_count, fmt_fixed, fmt_thousands, ArtifactWriter};
use crate::detectors::{
    BucketCount, ConcentrationAnomaly, DensityTest, HhiBucket, ThresholdAnalysis, ThresholdKind,
};
use crate::models::DISCLAIMER;
use anyhow::Result;

pub const SUMMARY_FILE: &str = "threshold-analysis-summary.md";

pub const DISTRIBUTION_HEADERS: [&str; 3] = ["bucket", "count", "percentage"];

pub const ANOMALY_HEADERS: [&str; 7] = [
    "threshold_type",
    "bucket",
    "count",
    "expected_count",
    "observed_vs_expected",
    "anomaly_type",
    "severity",
];

pub const HHI_HEADERS: [&str; 4] = ["bucket", "count", "percentage", "hhi"];

fn distribution_file(kind: ThresholdKind) -> &'static str {
    match kind {
        ThresholdKind::Services => "threshold-distribution.csv",
        ThresholdKind::Works => "threshold-distribution-works.csv",
    }
}

fn anomalies_file(kind: ThresholdKind) -> String {
    format!("threshold-anomalies-{}.csv", kind)
}

fn hhi_file(kind: ThresholdKind) -> String {
    format!("threshold-hhi-{}.csv", kind)
}

pub fn distribution_rows(distribution: &[BucketCount]) -> Vec<Vec<String>> {
    distribution
        .iter()
        .map(|b| {
            vec![
                b.label.to_string(),
                b.count.to_string(),
                fmt_fixed(b.percentage, 2),
            ]
        })
        .collect()
}

pub fn anomaly_rows(anomalies: &[ConcentrationAnomaly]) -> Vec<Vec<String>> {
    anomalies
        .iter()
        .map(|a| {
            vec![
                a.kind.to_string(),
                a.bucket.to_string(),
                a.count.to_string(),
                fmt_fixed(a.expected_count, 2),
                fmt_fixed(a.observed_vs_expected, 2),
                "concentration".to_string(),
                a.severity.to_string(),
            ]
        })
        .collect()
}

pub fn hhi_rows(hhi: &[HhiBucket]) -> Vec<Vec<String>> {
    hhi.iter()
        .map(|h| {
            vec![
                h.bucket.label.to_string(),
                h.bucket.count.to_string(),
                fmt_fixed(h.bucket.percentage, 2),
                fmt_fixed(h.hhi, 2),
            ]
        })
        .collect()
}

pub struct ThresholdSummary<'a> {
    pub files_read: usize,
    pub values: usize,
    pub skipped: usize,
    pub bandwidth: f64,
    pub analyses: &'a [ThresholdAnalysis],
}

pub fn render_threshold_summary(summary: &ThresholdSummary<'_>) -> String {
    let mut md = render_header(summary);
    md.push('\n');
    md.push_str(&render_methodology(summary));
    md.push_str("\n## Findings\n");
    for analysis in summary.analyses {
        md.push('\n');
        md.push_str(&render_analysis(analysis));
    }
    md.push('\n');
    md.push_str(&render_interpretation());
    md.push_str(&format!("\n---\n\n{}\n", DISCLAIMER));
    md
}

fn render_header(summary: &ThresholdSummary<'_>) -> String {
    let mut md = String::from(
        r#"# Threshold Clustering Analysis

This analysis identifies statistically unusual patterns in public procurement
contract values relative to EU tender thresholds. It looks for clustering of
values just below each threshold:
"#,
    );
    for analysis in summary.analyses {
        md.push_str(&format!(
            "- {} threshold: EUR {}\n",
            capitalize(&analysis.kind.to_string()),
            fmt_thousands(analysis.threshold)
        ));
    }
    md
}

fn render_methodology(summary: &ThresholdSummary<'_>) -> String {
    format!(
        r#"## Methodology

### Data
- Release files read: {files}
- Contracts with a positive award value: {values} ({skipped} skipped)

### Statistical Approach
- **Distribution analysis**: contract values binned as a share of the threshold
- **Concentration**: near-threshold buckets (90-100%) holding more than twice the
  uniform share are flagged; high severity above three times
- **Herfindahl-Hirschman Index (HHI)**: concentration of the bucket shares
- **Density discontinuity test**: compares the bin just below the threshold,
  [{lo}, 1), with the bin just above, [1, {hi}). Without a discontinuity both bins
  hold about as many values, so the count below follows Binomial(n, 1/2). The
  statistic is z = (below - above) / sqrt(below + above), chi-square = z^2, with a
  two-sided p-value from the standard normal. It is not computed when fewer than
  5 values fall in the two bins. This reference distribution assumes a flat
  density around the threshold; the data owner should confirm it before the
  result is relied on.

### Threshold Zones Analyzed
- 0-10%, 10-20%, ..., 80-90% (far below threshold)
- 90-95%, 95-99%, 99-100% (just below threshold)
- >100% (above threshold)
"#,
        files = fmt_count(summary.files_read),
        values = fmt_count(summary.values),
        skipped = fmt_count(summary.skipped),
        lo = fmt_fixed(1.0 - summary.bandwidth, 2),
        hi = fmt_fixed(1.0 + summary.bandwidth, 2),
    )
}

fn render_analysis(analysis: &ThresholdAnalysis) -> String {
    let mut md = format!(
        r#"### {} Threshold (EUR {})

**Distribution:**

| Bucket | Count | Percentage |
|--------|-------|------------|
"#,
        capitalize(&analysis.kind.to_string()),
        fmt_thousands(analysis.threshold)
    );
    for b in &analysis.distribution {
        md.push_str(&format!(
            "| {} | {} | {}% |\n",
            b.label,
            b.count,
            fmt_fixed(b.percentage, 2)
        ));
    }

    md.push_str(&format!(
        "\n**HHI:** {}\n\n**Threshold Anomalies:**\n\n",
        fmt_fixed(analysis.hhi_index, 2)
    ));
    if analysis.anomalies.is_empty() {
        md.push_str("No concentration anomalies detected.\n");
    } else {
        md.push_str(
            "| Bucket | Count | Expected | Observed/Expected | Severity |\n\
             |--------|-------|----------|-------------------|----------|\n",
        );
        for a in &analysis.anomalies {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                a.bucket,
                a.count,
                fmt_fixed(a.expected_count, 2),
                fmt_fixed(a.observed_vs_expected, 2),
                a.severity
            ));
        }
    }

    md.push('\n');
    md.push_str(&render_density(&analysis.density));
    md
}

fn render_density(test: &DensityTest) -> String {
    let stat = |v: Option<f64>| v.map(|x| fmt_fixed(x, 4)).unwrap_or_else(|| "n/a".into());
    format!(
        r#"**Density Discontinuity Test** (bandwidth {bw}):
- Values just below the threshold: {left}
- Values just above the threshold: {right}
- Near-threshold observations: {near}
- Far-left observations: {far_left}
- Far-right observations: {far_right}
- Chi-square statistic: {chi2}
- P-value: {p}
- Z-score: {z}
"#,
        bw = test.bandwidth,
        left = test.left,
        right = test.right,
        near = test.near,
        far_left = test.far_left,
        far_right = test.far_right,
        chi2 = stat(test.chi2),
        p = stat(test.p_value),
        z = stat(test.z_score),
    )
}

fn render_interpretation() -> String {
    r#"## Interpretation

**Statistical significance:**
- P-values < 0.05 indicate a statistically significant difference between the
  bins below and above the threshold
- Positive z-scores mean more values fall just below the threshold

**HHI interpretation:**
- HHI < 1500: low concentration
- 1500 <= HHI < 2500: moderate concentration
- HHI >= 2500: high concentration

## Limitations

1. **Data quality**: Contract values may be missing or estimated
2. **Threshold exemptions**: Some contracts are exempt from thresholds
3. **Temporal trends**: The analysis does not distinguish between years
4. **Contract modifications**: Value changes are not captured in static snapshots
"#
    .to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Write all tables and the summary, in a fixed order
pub fn write_threshold(writer: &mut ArtifactWriter, summary: &ThresholdSummary<'_>) -> Result<()> {
    for analysis in summary.analyses {
        writer.write_csv(
            distribution_file(analysis.kind),
            &DISTRIBUTION_HEADERS,
            distribution_rows(&analysis.distribution),
        )?;
    }
    for analysis in summary.analyses {
        writer.write_csv(
            &anomalies_file(analysis.kind),
            &ANOMALY_HEADERS,
            anomaly_rows(&analysis.anomalies),
        )?;
    }
    for analysis in summary.analyses {
        writer.write_csv(
            &hhi_file(analysis.kind),
            &HHI_HEADERS,
            hhi_rows(&analysis.hhi),
        )?;
    }
    writer.write_text(SUMMARY_FILE, &render_threshold_summary(summary))?;
    Ok(())
}

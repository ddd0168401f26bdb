//! Procurement threshold bunching
//!
//! Contract values are expressed as a ratio to a regulatory threshold and
//! binned into fixed buckets. Bunching just below the threshold shows up
//! three ways:
//! - concentration: a near-threshold bucket holds far more than the
//!   uniform share
//! - HHI: the bucket shares are concentrated overall
//! - density discontinuity: the bin just below the threshold is fuller
//!   than the bin just above it

use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use tracing::{debug, info};

/// Bucket edges on the ratio scale; bucket `i` is `[EDGES[i], EDGES[i + 1])`
pub const BUCKET_EDGES: [f64; 14] = [
    0.0,
    0.10,
    0.20,
    0.30,
    0.40,
    0.50,
    0.60,
    0.70,
    0.80,
    0.90,
    0.95,
    0.99,
    1.0,
    f64::INFINITY,
];

pub const BUCKET_LABELS: [&str; 13] = [
    "0-10%", "10-20%", "20-30%", "30-40%", "40-50%", "50-60%", "60-70%", "70-80%", "80-90%",
    "90-95%", "95-99%", "99-100%", ">100%",
];

/// Start of the near-threshold zone on the ratio scale
const NEAR_ZONE_START: f64 = 0.90;

/// Minimum observations in the two bins around the threshold for a test
const MIN_DENSITY_OBSERVATIONS: usize = 5;

/// Which regulatory threshold the ratios refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    Services,
    Works,
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdKind::Services => write!(f, "services"),
            ThresholdKind::Works => write!(f, "works"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketCount {
    pub label: &'static str,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// Share of all values, in percent
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationAnomaly {
    pub kind: ThresholdKind,
    pub bucket: &'static str,
    pub count: usize,
    pub expected_count: f64,
    pub observed_vs_expected: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HhiBucket {
    pub bucket: BucketCount,
    /// `share^2 * 10000`
    pub hhi: f64,
}

/// Comparison of the bins immediately below and above the threshold
#[derive(Debug, Clone, PartialEq)]
pub struct DensityTest {
    pub bandwidth: f64,
    /// Count in `[1 - bw, 1)`
    pub left: usize,
    /// Count in `[1, 1 + bw)`
    pub right: usize,
    /// Count in `[1 - bw, 1 + bw]`
    pub near: usize,
    /// Count below `1 - bw`
    pub far_left: usize,
    /// Count above `1 + bw`
    pub far_right: usize,
    /// `None` when fewer than five values fall in the two bins
    pub z_score: Option<f64>,
    pub chi2: Option<f64>,
    pub p_value: Option<f64>,
}

/// Full analysis for one threshold
#[derive(Debug, Clone)]
pub struct ThresholdAnalysis {
    pub kind: ThresholdKind,
    pub threshold: f64,
    pub n: usize,
    pub distribution: Vec<BucketCount>,
    pub anomalies: Vec<ConcentrationAnomaly>,
    pub hhi: Vec<HhiBucket>,
    pub hhi_index: f64,
    pub density: DensityTest,
}

/// Index of the bucket holding `ratio`, if any
pub fn bucket_index(ratio: f64) -> Option<usize> {
    if !(ratio >= BUCKET_EDGES[0]) {
        return None;
    }
    BUCKET_EDGES
        .windows(2)
        .position(|w| ratio >= w[0] && ratio < w[1])
}

/// Count ratios per bucket
pub fn bucketize(ratios: &[f64]) -> Vec<BucketCount> {
    let mut counts = [0usize; BUCKET_LABELS.len()];
    for &r in ratios {
        if let Some(i) = bucket_index(r) {
            counts[i] += 1;
        }
    }
    let total = ratios.len();
    BUCKET_LABELS
        .iter()
        .enumerate()
        .map(|(i, &label)| BucketCount {
            label,
            lower: BUCKET_EDGES[i],
            upper: BUCKET_EDGES[i + 1],
            count: counts[i],
            percentage: if total == 0 {
                0.0
            } else {
                counts[i] as f64 / total as f64 * 100.0
            },
        })
        .collect()
}

/// Near-threshold buckets holding more than twice the uniform share.
///
/// Severity is high above three times the uniform share.
pub fn concentration_anomalies(
    distribution: &[BucketCount],
    kind: ThresholdKind,
) -> Vec<ConcentrationAnomaly> {
    let total: usize = distribution.iter().map(|b| b.count).sum();
    if distribution.is_empty() || total == 0 {
        return Vec::new();
    }
    let expected = total as f64 / distribution.len() as f64;

    distribution
        .iter()
        .filter(|b| b.lower >= NEAR_ZONE_START && b.upper <= 1.0)
        .filter(|b| b.count as f64 > 2.0 * expected)
        .map(|b| {
            let ratio = b.count as f64 / expected;
            ConcentrationAnomaly {
                kind,
                bucket: b.label,
                count: b.count,
                expected_count: expected,
                observed_vs_expected: ratio,
                severity: if ratio > 3.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
            }
        })
        .collect()
}

/// Per-bucket HHI contributions and their sum
pub fn hhi(distribution: &[BucketCount]) -> (Vec<HhiBucket>, f64) {
    let total: usize = distribution.iter().map(|b| b.count).sum();
    let rows: Vec<HhiBucket> = distribution
        .iter()
        .map(|b| {
            let share = if total == 0 {
                0.0
            } else {
                b.count as f64 / total as f64
            };
            HhiBucket {
                bucket: b.clone(),
                hhi: share * share * 10_000.0,
            }
        })
        .collect();
    let index = rows.iter().map(|r| r.hhi).sum();
    (rows, index)
}

/// Two-sided p-value of a standard normal statistic
fn two_sided_p(z: f64) -> Option<f64> {
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some(2.0 * (1.0 - normal.cdf(z.abs())))
}

/// Compare the bins `[1 - bw, 1)` and `[1, 1 + bw)` on the ratio scale.
///
/// Without a discontinuity both bins hold about the same number of values,
/// so `left` given `left + right` is Binomial(n, 1/2). Its normal
/// approximation gives `z = (left - right) / sqrt(left + right)`.
pub fn density_discontinuity(ratios: &[f64], bandwidth: f64) -> DensityTest {
    let lo = 1.0 - bandwidth;
    let hi = 1.0 + bandwidth;

    let mut test = DensityTest {
        bandwidth,
        left: 0,
        right: 0,
        near: 0,
        far_left: 0,
        far_right: 0,
        z_score: None,
        chi2: None,
        p_value: None,
    };
    for &r in ratios {
        if (lo..1.0).contains(&r) {
            test.left += 1;
        } else if (1.0..hi).contains(&r) {
            test.right += 1;
        }
        if r < lo {
            test.far_left += 1;
        } else if r > hi {
            test.far_right += 1;
        } else {
            test.near += 1;
        }
    }

    let n = test.left + test.right;
    if n >= MIN_DENSITY_OBSERVATIONS {
        let z = (test.left as f64 - test.right as f64) / (n as f64).sqrt();
        test.z_score = Some(z);
        test.chi2 = Some(z * z);
        test.p_value = two_sided_p(z);
    }
    test
}

pub struct ThresholdDetector {
    services_threshold: f64,
    works_threshold: f64,
    bandwidth: f64,
}

impl ThresholdDetector {
    pub fn new(services_threshold: f64, works_threshold: f64, bandwidth: f64) -> Self {
        Self {
            services_threshold,
            works_threshold,
            bandwidth,
        }
    }

    pub fn threshold(&self, kind: ThresholdKind) -> f64 {
        match kind {
            ThresholdKind::Services => self.services_threshold,
            ThresholdKind::Works => self.works_threshold,
        }
    }

    /// Analyze contract values against one threshold
    pub fn analyze(&self, values: &[f64], kind: ThresholdKind) -> ThresholdAnalysis {
        let threshold = self.threshold(kind);
        let ratios: Vec<f64> = values.iter().map(|v| v / threshold).collect();

        let distribution = bucketize(&ratios);
        let anomalies = concentration_anomalies(&distribution, kind);
        let (hhi, hhi_index) = hhi(&distribution);
        let density = density_discontinuity(&ratios, self.bandwidth);

        debug!(
            "{} threshold: left bin {}, right bin {}",
            kind, density.left, density.right
        );
        info!(
            "{} threshold ({:.0}): {} values, {} concentration anomalies, HHI {:.2}",
            kind,
            threshold,
            values.len(),
            anomalies.len(),
            hhi_index
        );

        ThresholdAnalysis {
            kind,
            threshold,
            n: values.len(),
            distribution,
            anomalies,
            hhi,
            hhi_index,
            density,
        }
    }

    /// Services and works analyses, in that order
    pub fn detect(&self, values: &[f64]) -> Vec<ThresholdAnalysis> {
        [ThresholdKind::Services, ThresholdKind::Works]
            .into_iter()
            .map(|kind| self.analyze(values, kind))
            .collect()
    }
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self::new(221_000.0, 5_538_000.0, 0.05)
    }
}

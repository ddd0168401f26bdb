//! Entity matching helpers
//!
//! Key normalization, fuzzy name similarity and bucketed pair clustering
//! shared by the registry cross-reference detectors.

mod cluster;
mod similarity;

pub use cluster::{bucket_by, cluster_pairs, CandidatePair};
pub use similarity::ratio;

/// Legal-form tokens removed from names before comparison
const LEGAL_SUFFIXES: &[&str] = &["b.v.", "bv"];

/// Normalize a Dutch postcode: drop all spaces and uppercase.
///
/// `"1234 ab"` and `"1234AB"` normalize to the same key.
pub fn normalize_postcode(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Normalize a company name for fuzzy comparison.
///
/// Lowercases, removes every occurrence of a legal-form suffix and trims.
pub fn normalize_name(raw: &str) -> String {
    let mut name = raw.to_lowercase();
    for suffix in LEGAL_SUFFIXES {
        name = name.replace(suffix, "");
    }
    name.trim().to_string()
}

/// Similarity of two company names after normalization, in `[0, 1]`
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize_name(a).chars().collect();
    let b: Vec<char> = normalize_name(b).chars().collect();
    ratio(&a, &b)
}

//! Phoenix signal detector
//!
//! Pairs of insolvent entities at the same postcode that also share an
//! activity code or have similar names may be a company wound up and
//! restarted under a new registration.

use crate::matching::{cluster_pairs, name_similarity, normalize_postcode};
use crate::models::round_to;
use crate::sources::insolvency::InsolvencyRecord;
use crate::sources::kvk::KvkProfile;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

/// Pairs need this many signals, the shared postcode included
const MIN_SIGNALS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhoenixSignal {
    SamePostcode,
    SharedSbi,
    /// Name similarity at or above the threshold
    NameSimilarity(f64),
}

impl fmt::Display for PhoenixSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoenixSignal::SamePostcode => write!(f, "same_postcode"),
            PhoenixSignal::SharedSbi => write!(f, "shared_sbi"),
            PhoenixSignal::NameSimilarity(r) => write!(f, "name_sim_{:.2}", r),
        }
    }
}

/// A candidate predecessor/successor pair
#[derive(Debug, Clone, PartialEq)]
pub struct PhoenixPair {
    pub postcode: String,
    pub first: InsolvencyRecord,
    pub second: InsolvencyRecord,
    pub shared_sbi: BTreeSet<String>,
    pub signals: Vec<PhoenixSignal>,
    pub name_similarity: f64,
}

impl PhoenixPair {
    /// Signals joined with `;`
    pub fn signal_list(&self) -> String {
        self.signals
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Pair identity: the case number, or KVK number and name without one
fn identity(record: &InsolvencyRecord) -> String {
    if record.case_number.is_empty() {
        format!("{}:{}", record.kvk_number, record.name)
    } else {
        record.case_number.clone()
    }
}

pub struct PhoenixDetector {
    name_threshold: f64,
}

impl PhoenixDetector {
    pub fn new(name_threshold: f64) -> Self {
        Self { name_threshold }
    }

    pub fn detect(
        &self,
        records: &[InsolvencyRecord],
        profiles: &BTreeMap<String, KvkProfile>,
    ) -> Vec<PhoenixPair> {
        let empty = BTreeSet::new();
        let codes = |r: &InsolvencyRecord| {
            profiles
                .get(&r.kvk_number)
                .map(|p| &p.sbi_codes)
                .unwrap_or(&empty)
        };

        let candidates = cluster_pairs(
            records,
            |r| normalize_postcode(&r.postcode),
            identity,
            |a, b| {
                let mut signals = Vec::new();
                if !codes(a).is_disjoint(codes(b)) {
                    signals.push(PhoenixSignal::SharedSbi);
                }
                let sim = name_similarity(&a.name, &b.name);
                if sim >= self.name_threshold {
                    signals.push(PhoenixSignal::NameSimilarity(sim));
                }
                signals
            },
            MIN_SIGNALS,
        );

        let mut pairs: Vec<PhoenixPair> = candidates
            .into_iter()
            .map(|c| {
                let mut signals = vec![PhoenixSignal::SamePostcode];
                signals.extend(c.signals);
                PhoenixPair {
                    postcode: c.bucket,
                    shared_sbi: codes(c.first)
                        .intersection(codes(c.second))
                        .cloned()
                        .collect(),
                    name_similarity: name_similarity(&c.first.name, &c.second.name),
                    first: c.first.clone(),
                    second: c.second.clone(),
                    signals,
                }
            })
            .collect();

        // Ranked on the reported two-decimal similarity; ties keep postcode order
        pairs.sort_by(|a, b| {
            round_to(b.name_similarity, 2)
                .partial_cmp(&round_to(a.name_similarity, 2))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        info!("Found {} potential phoenix signal pairs", pairs.len());
        pairs
    }
}

impl Default for PhoenixDetector {
    fn default() -> Self {
        Self::new(0.6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(case: &str, kvk: &str, name: &str, postcode: &str) -> InsolvencyRecord {
        InsolvencyRecord {
            kvk_number: kvk.into(),
            name: name.into(),
            case_number: case.into(),
            postcode: postcode.into(),
            ..Default::default()
        }
    }

    fn profiles(entries: &[(&str, &[&str])]) -> BTreeMap<String, KvkProfile> {
        entries
            .iter()
            .map(|(kvk, codes)| {
                (
                    kvk.to_string(),
                    KvkProfile {
                        earliest_start: None,
                        sbi_codes: codes.iter().map(|c| c.to_string()).collect(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_similar_names_flag_without_shared_sector() {
        let records = vec![
            record("F/1", "1", "Bouwbedrijf De Vries B.V.", "1234AB"),
            record("F/2", "2", "Bouwbedrijf De Vries Holding", "1234 AB"),
        ];
        let pairs = PhoenixDetector::default().detect(&records, &profiles(&[]));
        assert_eq!(pairs.len(), 1);
        let p = &pairs[0];
        assert_eq!(p.postcode, "1234AB");
        assert!(p.shared_sbi.is_empty());
        assert!(p.name_similarity >= 0.6);
        assert!(p.signal_list().starts_with("same_postcode;name_sim_"));
    }

    #[test]
    fn test_postcode_alone_is_not_flagged() {
        let records = vec![
            record("F/1", "1", "Alpha", "1234AB"),
            record("F/2", "2", "Zwembad", "1234AB"),
        ];
        let p = profiles(&[("1", &["4120"]), ("2", &["5610"])]);
        assert!(PhoenixDetector::default().detect(&records, &p).is_empty());
    }

    #[test]
    fn test_shared_sector_is_a_signal() {
        let records = vec![
            record("F/1", "1", "Alpha", "1234AB"),
            record("F/2", "2", "Zwembad", "1234AB"),
            record("F/3", "3", "Omega", "9999ZZ"),
        ];
        let p = profiles(&[("1", &["4120", "4399"]), ("2", &["4399"]), ("3", &["4399"])]);
        let pairs = PhoenixDetector::default().detect(&records, &p);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].signal_list(), "same_postcode;shared_sbi");
        assert_eq!(
            pairs[0].shared_sbi.iter().cloned().collect::<Vec<_>>(),
            vec!["4399".to_string()]
        );
    }

    #[test]
    fn test_records_without_postcode_are_ignored() {
        let records = vec![
            record("F/1", "1", "Jansen", ""),
            record("F/2", "2", "Jansen", ""),
        ];
        assert!(PhoenixDetector::default()
            .detect(&records, &profiles(&[]))
            .is_empty());
    }

    #[test]
    fn test_sorted_by_similarity() {
        let records = vec![
            record("F/1", "1", "Alpha Bouw", "1000AA"),
            record("F/2", "2", "Alpha Bouwe", "1000AA"),
            record("F/3", "3", "Gamma", "2000BB"),
            record("F/4", "4", "Gamma", "2000BB"),
        ];
        let pairs = PhoenixDetector::default().detect(&records, &profiles(&[]));
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].postcode, "2000BB");
        assert_eq!(pairs[0].name_similarity, 1.0);
        assert!(pairs[1].name_similarity < 1.0);
    }
}

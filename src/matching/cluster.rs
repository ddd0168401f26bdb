//! Bucketed pairwise clustering
//!
//! Entities are partitioned by an exact key; within a bucket every
//! unordered pair is scored once. Sharing the bucket key counts as one
//! signal, so a pair needs `min_signals - 1` further signals to be kept.
//! Cost is the sum of squared bucket sizes.

use std::collections::{BTreeMap, BTreeSet};

/// A pair of entities that share a bucket and enough signals
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair<'a, T, S> {
    pub bucket: String,
    pub first: &'a T,
    pub second: &'a T,
    /// Signals beyond the shared bucket key
    pub signals: Vec<S>,
}

/// Group items by key, skipping items whose key is empty.
///
/// Buckets are ordered by key; items keep their input order.
pub fn bucket_by<'a, T, F>(items: &'a [T], key: F) -> BTreeMap<String, Vec<&'a T>>
where
    F: Fn(&T) -> String,
{
    let mut buckets: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        let k = key(item);
        if k.is_empty() {
            continue;
        }
        buckets.entry(k).or_default().push(item);
    }
    buckets
}

/// Score every unordered pair inside each bucket.
///
/// `identity` names an entity for pair de-duplication: a pair whose sorted
/// identities were already seen is skipped, also across buckets. `score`
/// returns the signals of a pair beyond the shared key.
pub fn cluster_pairs<'a, T, K, I, F, S>(
    items: &'a [T],
    key: K,
    identity: I,
    score: F,
    min_signals: usize,
) -> Vec<CandidatePair<'a, T, S>>
where
    K: Fn(&T) -> String,
    I: Fn(&T) -> String,
    F: Fn(&T, &T) -> Vec<S>,
{
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut pairs = Vec::new();

    for (bucket, members) in bucket_by(items, key) {
        if members.len() < 2 {
            continue;
        }
        for (i, &first) in members.iter().enumerate() {
            for &second in &members[i + 1..] {
                let (a, b) = (identity(first), identity(second));
                let pair_key = if a <= b { (a, b) } else { (b, a) };
                if !seen.insert(pair_key) {
                    continue;
                }
                let signals = score(first, second);
                if signals.len() + 1 >= min_signals {
                    pairs.push(CandidatePair {
                        bucket: bucket.clone(),
                        first,
                        second,
                        signals,
                    });
                }
            }
        }
    }
    pairs
}

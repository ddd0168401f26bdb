//! Ghost childcare provider signals
//!
//! Three independent signals per registered childcare location:
//! 1. Inactive KVK: the holder's KVK number is absent from the register
//! 2. Invalid address: the normalized postcode does not exist in BAG
//! 3. Address stacking: many active providers share one postcode

use crate::matching::{bucket_by, normalize_postcode};
use crate::sources::bag::BagPostcodes;
use crate::sources::lrk::LrkRecord;
use std::collections::BTreeSet;
use tracing::info;

/// A provider whose postcode is not a known address
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidAddress<'a> {
    pub provider: &'a LrkRecord,
    pub normalized_postcode: String,
}

/// All active providers registered at one postcode
#[derive(Debug, Clone, PartialEq)]
pub struct StackedPostcode<'a> {
    pub postcode: String,
    pub providers: Vec<&'a LrkRecord>,
    /// Distinct non-empty KVK holders among the providers
    pub unique_kvk_holders: usize,
}

/// Outcome of all three signals
#[derive(Debug, Clone, Default)]
pub struct GhostProviderReport<'a> {
    pub inactive_kvk: Vec<&'a LrkRecord>,
    pub invalid_addresses: Vec<InvalidAddress<'a>>,
    /// Ordered by provider count descending, then postcode
    pub stacking: Vec<StackedPostcode<'a>>,
    /// Providers that had a KVK number to check
    pub kvk_checked: usize,
    /// Providers that had a postcode to check
    pub postcodes_checked: usize,
}

impl GhostProviderReport<'_> {
    /// Number of provider rows across all stacked postcodes
    pub fn stacking_rows(&self) -> usize {
        self.stacking.iter().map(|s| s.providers.len()).sum()
    }
}

pub struct GhostProviderDetector {
    stacking_threshold: usize,
    active_status: String,
}

impl GhostProviderDetector {
    pub fn new(stacking_threshold: usize, active_status: impl Into<String>) -> Self {
        Self {
            stacking_threshold,
            active_status: active_status.into(),
        }
    }

    pub fn is_active(&self, provider: &LrkRecord) -> bool {
        provider.status == self.active_status
    }

    /// Providers whose non-empty KVK number is missing from the register
    pub fn inactive_kvk<'a>(
        &self,
        providers: &'a [LrkRecord],
        kvk_numbers: &BTreeSet<String>,
    ) -> (Vec<&'a LrkRecord>, usize) {
        let with_kvk: Vec<&LrkRecord> = providers
            .iter()
            .filter(|p| !p.kvk_number.is_empty())
            .collect();
        let checked = with_kvk.len();
        let inactive = with_kvk
            .into_iter()
            .filter(|p| !kvk_numbers.contains(&p.kvk_number))
            .collect();
        (inactive, checked)
    }

    /// Providers whose normalized postcode is not in BAG
    pub fn invalid_addresses<'a>(
        &self,
        providers: &'a [LrkRecord],
        bag: &BagPostcodes,
    ) -> (Vec<InvalidAddress<'a>>, usize) {
        let mut checked = 0;
        let mut invalid = Vec::new();
        for provider in providers {
            if provider.postcode.is_empty() {
                continue;
            }
            checked += 1;
            let normalized = normalize_postcode(&provider.postcode);
            if !bag.contains(&normalized) {
                invalid.push(InvalidAddress {
                    provider,
                    normalized_postcode: normalized,
                });
            }
        }
        (invalid, checked)
    }

    /// Postcodes with at least `stacking_threshold` active providers
    pub fn address_stacking<'a>(&self, providers: &'a [LrkRecord]) -> Vec<StackedPostcode<'a>> {
        let buckets = bucket_by(providers, |p| {
            if self.is_active(p) {
                normalize_postcode(&p.postcode)
            } else {
                String::new()
            }
        });

        let mut stacked: Vec<StackedPostcode<'a>> = buckets
            .into_iter()
            .filter(|(_, members)| members.len() >= self.stacking_threshold)
            .map(|(postcode, members)| {
                let unique_kvk_holders = members
                    .iter()
                    .filter(|p| !p.kvk_number.is_empty())
                    .map(|p| p.kvk_number.as_str())
                    .collect::<BTreeSet<_>>()
                    .len();
                StackedPostcode {
                    postcode,
                    providers: members,
                    unique_kvk_holders,
                }
            })
            .collect();

        // Buckets arrive in postcode order; the stable sort keeps it for ties
        stacked.sort_by(|a, b| b.providers.len().cmp(&a.providers.len()));
        stacked
    }

    pub fn detect<'a>(
        &self,
        providers: &'a [LrkRecord],
        kvk_numbers: &BTreeSet<String>,
        bag: &BagPostcodes,
    ) -> GhostProviderReport<'a> {
        let (inactive_kvk, kvk_checked) = self.inactive_kvk(providers, kvk_numbers);
        let (invalid_addresses, postcodes_checked) = self.invalid_addresses(providers, bag);
        let stacking = self.address_stacking(providers);

        info!(
            "Ghost provider signals: {} inactive KVK of {} checked, {} invalid postcodes of {} checked, {} stacked postcodes",
            inactive_kvk.len(),
            kvk_checked,
            invalid_addresses.len(),
            postcodes_checked,
            stacking.len()
        );

        GhostProviderReport {
            inactive_kvk,
            invalid_addresses,
            stacking,
            kvk_checked,
            postcodes_checked,
        }
    }
}

impl Default for GhostProviderDetector {
    fn default() -> Self {
        Self::new(3, "Ingeschreven")
    }
}

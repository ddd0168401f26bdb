//! Rapid insolvency detector
//!
//! Cross-references insolvency cases with the KVK register and flags
//! companies that were declared insolvent within `rapid_days` of their
//! earliest registered activity.

use crate::sources::insolvency::InsolvencyRecord;
use crate::sources::kvk::KvkProfile;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

/// Default window: three years
pub const DEFAULT_RAPID_DAYS: i64 = 3 * 365;

/// A company that went insolvent shortly after registration
#[derive(Debug, Clone, PartialEq)]
pub struct RapidInsolvency {
    pub kvk_number: String,
    pub company_name: String,
    pub registration_date: NaiveDate,
    /// Pronouncement date as published
    pub insolvency_date: String,
    pub days_to_insolvency: i64,
    /// Sorted activity codes joined with `,`
    pub sbi_codes: String,
    pub postcode: String,
    pub address: String,
    pub city: String,
    pub case_number: String,
}

/// Result of the cross reference
#[derive(Debug, Clone, Default)]
pub struct CrossReference {
    /// Insolvency records whose KVK number is in the register
    pub matched: usize,
    /// Sorted by days to insolvency, ascending
    pub rapid: Vec<RapidInsolvency>,
}

/// Parse a publication date (`YYYY-MM-DD`, optionally followed by a time)
pub fn parse_publication_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub struct RapidInsolvencyDetector {
    rapid_days: i64,
}

impl RapidInsolvencyDetector {
    pub fn new(rapid_days: i64) -> Self {
        Self { rapid_days }
    }

    pub fn detect(
        &self,
        profiles: &BTreeMap<String, KvkProfile>,
        records: &[InsolvencyRecord],
    ) -> CrossReference {
        let mut result = CrossReference::default();

        for record in records {
            let Some(profile) = profiles.get(&record.kvk_number) else {
                continue;
            };
            result.matched += 1;

            let (Some(registered), Some(insolvent)) = (
                profile.earliest_start,
                parse_publication_date(&record.pronouncement_date),
            ) else {
                continue;
            };

            let days = (insolvent - registered).num_days();
            if days <= 0 || days > self.rapid_days {
                continue;
            }

            result.rapid.push(RapidInsolvency {
                kvk_number: record.kvk_number.clone(),
                company_name: record.name.clone(),
                registration_date: registered,
                insolvency_date: record.pronouncement_date.clone(),
                days_to_insolvency: days,
                sbi_codes: profile
                    .sbi_codes
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                postcode: record.postcode.clone(),
                address: record.address(),
                city: record.city.clone(),
                case_number: record.case_number.clone(),
            });
        }

        result.rapid.sort_by_key(|r| r.days_to_insolvency);
        info!(
            "Matched {} insolvency records to KVK data, {} within {} days",
            result.matched,
            result.rapid.len(),
            self.rapid_days
        );
        result
    }
}

impl Default for RapidInsolvencyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RAPID_DAYS)
    }
}

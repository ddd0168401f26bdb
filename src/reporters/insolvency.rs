//! Insolvency cross-reference artifacts

use super::{fmt_count, fmt_fixed, ArtifactWriter};
use crate::detectors::{PhoenixPair, RapidInsolvency};
use crate::models::DISCLAIMER;
use anyhow::Result;
use std::collections::BTreeMap;

pub const RAPID_FILE: &str = "rapid-insolvency-entities.csv";
pub const PHOENIX_FILE: &str = "phoenix-signal-clusters.csv";
pub const SUMMARY_FILE: &str = "phoenix-analysis-summary.md";

const TOP_SBI: usize = 10;

pub const RAPID_HEADERS: [&str; 10] = [
    "kvk_number",
    "company_name",
    "registration_date",
    "insolvency_date",
    "days_to_insolvency",
    "sbi_codes",
    "postcode",
    "address",
    "city",
    "insolventienummer",
];

pub const PHOENIX_HEADERS: [&str; 12] = [
    "cluster_postcode",
    "entity_1_kvk",
    "entity_1_name",
    "entity_1_insolvency",
    "entity_1_bankruptcy_date",
    "entity_2_kvk",
    "entity_2_name",
    "entity_2_insolvency",
    "entity_2_bankruptcy_date",
    "shared_sbi_codes",
    "signals",
    "name_similarity",
];

pub fn rapid_rows(rapid: &[RapidInsolvency]) -> Vec<Vec<String>> {
    rapid
        .iter()
        .map(|r| {
            vec![
                r.kvk_number.clone(),
                r.company_name.clone(),
                r.registration_date.format("%Y-%m-%d").to_string(),
                r.insolvency_date.clone(),
                r.days_to_insolvency.to_string(),
                r.sbi_codes.clone(),
                r.postcode.clone(),
                r.address.clone(),
                r.city.clone(),
                r.case_number.clone(),
            ]
        })
        .collect()
}

pub fn phoenix_rows(pairs: &[PhoenixPair]) -> Vec<Vec<String>> {
    pairs
        .iter()
        .map(|p| {
            vec![
                p.postcode.clone(),
                p.first.kvk_number.clone(),
                p.first.name.clone(),
                p.first.case_number.clone(),
                p.first.pronouncement_date.clone(),
                p.second.kvk_number.clone(),
                p.second.name.clone(),
                p.second.case_number.clone(),
                p.second.pronouncement_date.clone(),
                p.shared_sbi
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                p.signal_list(),
                fmt_fixed(p.name_similarity, 2),
            ]
        })
        .collect()
}

pub struct InsolvencySummary<'a> {
    pub insolvency_records: usize,
    pub insolvency_skipped: usize,
    pub kvk_numbers: usize,
    pub matched: usize,
    pub rapid_days: i64,
    pub name_threshold: f64,
    pub rapid: &'a [RapidInsolvency],
    pub pairs: &'a [PhoenixPair],
}

/// Rapid insolvencies per pronouncement year
fn rapid_by_year(rapid: &[RapidInsolvency]) -> BTreeMap<String, usize> {
    let mut by_year = BTreeMap::new();
    for r in rapid {
        if let Some(year) = r.insolvency_date.get(..4) {
            *by_year.entry(year.to_string()).or_insert(0) += 1;
        }
    }
    by_year
}

/// Most frequent activity codes, ties in code order
fn top_sbi_codes(rapid: &[RapidInsolvency], limit: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rapid {
        for code in r.sbi_codes.split(',').filter(|c| !c.is_empty()) {
            *counts.entry(code).or_insert(0) += 1;
        }
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(code, n)| (code.to_string(), n))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted.truncate(limit);
    sorted
}

pub fn render_insolvency_summary(summary: &InsolvencySummary<'_>) -> String {
    let mut md = format!(
        r#"# KVK-Insolvency Cross-Reference: Potential Phoenix Company Analysis

> {disclaimer}

## Objective

Identify companies in the KVK register that went insolvent shortly after
registration, and pairs of related insolvent entities that may signal potential
phoenix company behavior, where entities are wound up to shed debts and
restarted under new registrations.

## Methodology

### Data Sources
- **KVK SBI dataset**: {kvk} KVK numbers with activity codes and start dates
  (the earliest start date is used as a proxy for the registration date)
- **Insolvency register**: {records} insolvency records ({skipped} skipped)

### Step 1: Rapid Insolvency Detection
- Matched insolvency records to KVK data via KVK number ({matched} matches)
- Computed the time from the earliest KVK start date to the pronouncement date
- Flagged entities where insolvency occurred within **{days} days** of registration

### Step 2: Phoenix Pair Detection
- Grouped insolvency records by postcode
- For each pair of insolvent entities sharing a postcode, checked for:
  1. **Shared SBI code** (same business sector)
  2. **Name similarity** (ratio >= {threshold})
- Pairs matching on **>= 2 signals** (postcode plus at least one other) are flagged

## Findings

### Rapid Insolvencies
- **{rapid} entities** went insolvent within {days} days of KVK registration
- Breakdown by insolvency year:
"#,
        disclaimer = DISCLAIMER,
        kvk = fmt_count(summary.kvk_numbers),
        records = fmt_count(summary.insolvency_records),
        skipped = fmt_count(summary.insolvency_skipped),
        matched = fmt_count(summary.matched),
        days = summary.rapid_days,
        threshold = summary.name_threshold,
        rapid = fmt_count(summary.rapid.len()),
    );

    for (year, count) in rapid_by_year(summary.rapid) {
        md.push_str(&format!("  - {}: {} entities\n", year, count));
    }

    if !summary.rapid.is_empty() {
        // Records arrive sorted by days ascending
        let days: Vec<i64> = summary.rapid.iter().map(|r| r.days_to_insolvency).collect();
        let average = days.iter().sum::<i64>() as f64 / days.len() as f64;
        md.push_str(&format!(
            "\n- Average days to insolvency: **{}** (median: **{}**)\n",
            fmt_fixed(average, 0),
            days[days.len() / 2]
        ));
        md.push_str(&format!(
            "- Fastest insolvency: **{} days** after registration\n",
            days[0]
        ));
    }

    md.push_str(
        r#"
### Top SBI Codes Among Rapid-Insolvency Entities

| SBI Code | Count |
|----------|-------|
"#,
    );
    for (code, count) in top_sbi_codes(summary.rapid, TOP_SBI) {
        md.push_str(&format!("| {} | {} |\n", code, count));
    }

    md.push_str(&format!(
        r#"
### Phoenix Signal Pairs
- **{} entity pairs** flagged as potential phoenix signals
- These pairs share a postcode AND at least one additional signal
  (shared SBI code or name similarity >= {})

## Limitations

1. **Registration date proxy**: The earliest SBI start date may not reflect the
   original incorporation date if activity codes were updated later.
2. **Address matching**: Only the postcode is compared, which can produce false
   positives in dense commercial areas.
3. **Name similarity**: String matching misses related entities that use entirely
   different names.
4. **Temporal gaps**: The insolvency register and the KVK extract cover different
   periods; companies dissolved before the extract may be missed.
5. **Not all insolvencies are suspicious**: Many rapid insolvencies are ordinary
   business failures, particularly in high-risk sectors.

## Conclusion

The rapid-insolvency list and the phoenix pairs are starting points for further
review, not evidence of wrongdoing.
"#,
        fmt_count(summary.pairs.len()),
        summary.name_threshold
    ));
    md
}

pub fn write_insolvency(writer: &mut ArtifactWriter, summary: &InsolvencySummary<'_>) -> Result<()> {
    writer.write_csv(RAPID_FILE, &RAPID_HEADERS, rapid_rows(summary.rapid))?;
    writer.write_csv(PHOENIX_FILE, &PHOENIX_HEADERS, phoenix_rows(summary.pairs))?;
    writer.write_text(SUMMARY_FILE, &render_insolvency_summary(summary))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::PhoenixSignal;
    use crate::sources::insolvency::InsolvencyRecord;
    use chrono::NaiveDate;

    fn rapid(kvk: &str, date: &str, days: i64, codes: &str) -> RapidInsolvency {
        RapidInsolvency {
            kvk_number: kvk.into(),
            company_name: format!("Company {}", kvk),
            registration_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            insolvency_date: date.into(),
            days_to_insolvency: days,
            sbi_codes: codes.into(),
            postcode: "1234AB".into(),
            address: "Dorpsstraat 1".into(),
            city: "Utrecht".into(),
            case_number: format!("F.16/21/{}", kvk),
        }
    }

    #[test]
    fn test_rapid_row_order() {
        let row = &rapid_rows(&[rapid("1", "2020-03-01", 60, "4120,4399")])[0];
        assert_eq!(row.len(), RAPID_HEADERS.len());
        assert_eq!(row[0], "1");
        assert_eq!(row[2], "2020-01-01");
        assert_eq!(row[4], "60");
        assert_eq!(row[9], "F.16/21/1");
    }

    #[test]
    fn test_phoenix_row() {
        let record = |case: &str, kvk: &str| InsolvencyRecord {
            kvk_number: kvk.into(),
            name: format!("Bouw {}", kvk),
            case_number: case.into(),
            pronouncement_date: "2021-05-01".into(),
            postcode: "1234AB".into(),
            ..Default::default()
        };
        let pair = PhoenixPair {
            postcode: "1234AB".into(),
            first: record("F/1", "1"),
            second: record("F/2", "2"),
            shared_sbi: ["4120".to_string(), "4399".to_string()].into_iter().collect(),
            signals: vec![
                PhoenixSignal::SamePostcode,
                PhoenixSignal::SharedSbi,
                PhoenixSignal::NameSimilarity(0.8333),
            ],
            name_similarity: 0.8333,
        };
        let row = &phoenix_rows(&[pair])[0];
        assert_eq!(row.len(), PHOENIX_HEADERS.len());
        assert_eq!(row[3], "F/1");
        assert_eq!(row[9], "4120,4399");
        assert_eq!(row[10], "same_postcode;shared_sbi;name_sim_0.83");
        assert_eq!(row[11], "0.83");
    }

    #[test]
    fn test_summary_statistics() {
        let records = vec![
            rapid("1", "2021-02-01", 31, "4120"),
            rapid("2", "2021-06-01", 200, "4120,5610"),
            rapid("3", "2022-01-01", 517, "5610"),
        ];
        let md = render_insolvency_summary(&InsolvencySummary {
            insolvency_records: 10,
            insolvency_skipped: 1,
            kvk_numbers: 50,
            matched: 7,
            rapid_days: 1095,
            name_threshold: 0.6,
            rapid: &records,
            pairs: &[],
        });
        assert!(md.contains(DISCLAIMER));
        assert!(md.contains("  - 2021: 2 entities\n  - 2022: 1 entities"));
        assert!(md.contains("Average days to insolvency: **249** (median: **200**)"));
        assert!(md.contains("Fastest insolvency: **31 days**"));
        assert!(md.contains("| 4120 | 2 |\n| 5610 | 2 |"));
        assert!(md.contains("**0 entity pairs**"));
    }
}

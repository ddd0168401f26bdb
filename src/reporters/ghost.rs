//! Ghost childcare provider artifacts

use super::{fmt_count, ArtifactWriter};
use crate::detectors::{GhostProviderReport, InvalidAddress, StackedPostcode};
use crate::models::DISCLAIMER;
use crate::sources::lrk::LrkRecord;
use anyhow::Result;
use std::collections::BTreeMap;

pub const INACTIVE_KVK_FILE: &str = "lrk-inactive-kvk.csv";
pub const INVALID_ADDRESS_FILE: &str = "lrk-invalid-address.csv";
pub const STACKING_FILE: &str = "lrk-address-stacking.csv";
pub const SUMMARY_FILE: &str = "ghost-provider-summary.md";

pub const INACTIVE_KVK_HEADERS: [&str; 11] = [
    "lrk_id",
    "type_oko",
    "lrk_status",
    "inschrijfdatum",
    "uitschrijfdatum",
    "kvk_nummer",
    "vestigingsnummer",
    "rechtsvorm",
    "postcode",
    "woonplaats",
    "signal",
];

pub const INVALID_ADDRESS_HEADERS: [&str; 9] = [
    "lrk_id",
    "type_oko",
    "lrk_status",
    "inschrijfdatum",
    "postcode",
    "postcode_normalized",
    "woonplaats",
    "kvk_nummer",
    "signal",
];

pub const STACKING_HEADERS: [&str; 9] = [
    "postcode",
    "provider_count_at_postcode",
    "unique_kvk_holders",
    "lrk_id",
    "type_oko",
    "kvk_nummer",
    "inschrijfdatum",
    "woonplaats",
    "aantal_kindplaatsen",
];

pub fn inactive_kvk_rows(providers: &[&LrkRecord]) -> Vec<Vec<String>> {
    providers
        .iter()
        .map(|p| {
            vec![
                p.lrk_id.clone(),
                p.type_oko.clone(),
                p.status.clone(),
                p.registered_on.clone(),
                p.deregistered_on.clone(),
                p.kvk_number.clone(),
                p.branch_number.clone(),
                p.legal_form.clone(),
                p.postcode.clone(),
                p.city.clone(),
                "kvk_not_in_active_register".to_string(),
            ]
        })
        .collect()
}

pub fn invalid_address_rows(invalid: &[InvalidAddress<'_>]) -> Vec<Vec<String>> {
    invalid
        .iter()
        .map(|i| {
            let p = i.provider;
            vec![
                p.lrk_id.clone(),
                p.type_oko.clone(),
                p.status.clone(),
                p.registered_on.clone(),
                p.postcode.clone(),
                i.normalized_postcode.clone(),
                p.city.clone(),
                p.kvk_number.clone(),
                "postcode_not_in_bag".to_string(),
            ]
        })
        .collect()
}

/// One row per provider, grouped by postcode in report order
pub fn stacking_rows(stacking: &[StackedPostcode<'_>]) -> Vec<Vec<String>> {
    stacking
        .iter()
        .flat_map(|s| {
            s.providers.iter().map(move |p| {
                vec![
                    s.postcode.clone(),
                    s.providers.len().to_string(),
                    s.unique_kvk_holders.to_string(),
                    p.lrk_id.clone(),
                    p.type_oko.clone(),
                    p.kvk_number.clone(),
                    p.registered_on.clone(),
                    p.city.clone(),
                    p.places.clone(),
                ]
            })
        })
        .collect()
}

pub struct GhostSummary<'a> {
    pub lrk_total: usize,
    /// Providers with the active status
    pub lrk_active: usize,
    pub lrk_skipped: usize,
    pub kvk_numbers: usize,
    pub bag_postcodes: usize,
    pub bag_files: usize,
    pub stacking_threshold: usize,
    pub active_status: &'a str,
    pub report: &'a GhostProviderReport<'a>,
}

pub fn render_ghost_summary(summary: &GhostSummary<'_>) -> String {
    let report = summary.report;
    let active = summary.active_status;

    let inactive_still_active = report
        .inactive_kvk
        .iter()
        .filter(|p| p.status == active)
        .count();
    let invalid_still_active = report
        .invalid_addresses
        .iter()
        .filter(|i| i.provider.status == active)
        .count();

    let mut md = format!(
        r#"# Ghost Provider Analysis: LRK x KVK x BAG Cross-Reference

> {disclaimer}

## Objective

Identify potential ghost childcare providers in the Landelijk Register
Kinderopvang (LRK) by cross-referencing it with KVK company data and the BAG
address registry. Ghost registrations may signal potential abuse of the
childcare benefit system.

## Data Sources

- **LRK** (Landelijk Register Kinderopvang): {lrk_total} records
  ({lrk_active} currently registered, {lrk_skipped} skipped)
- **KVK SBI dataset**: {kvk} unique KVK numbers
- **BAG** (Basisregistratie Adressen en Gebouwen): {bag} unique postcodes
  extracted from {bag_files} address files

## Methodology

### Signal 1: Inactive KVK Registration
- Matched the LRK holder KVK number against the KVK open dataset
- KVK numbers absent from the dataset are flagged as potentially dissolved or
  inactive; absence may also reflect differences in extraction dates

### Signal 2: Invalid Address (Postcode Not in BAG)
- Normalized provider postcodes (spaces removed, uppercase)
- Postcodes not found in BAG may indicate non-existent addresses

### Signal 3: Address Stacking ({threshold}+ Providers per Postcode)
- Grouped providers with status {active} by postcode
- Flagged postcodes with {threshold} or more providers
- Counted unique KVK holders to separate multi-branch operators from distinct
  entities sharing an address

## Findings

### Inactive KVK Registrations
- **{inactive}** LRK providers have KVK numbers not found in the KVK dataset
- Of these, **{inactive_active}** are still registered in LRK (status: {active})

### Invalid Addresses
- **{invalid}** LRK providers have postcodes not found in BAG
- Of these, **{invalid_active}** are still registered in LRK

### Address Stacking
- **{stacked}** postcodes have {threshold}+ active LRK providers ({stacked_rows} providers)

| Providers at postcode | Number of postcodes |
|-----------------------|---------------------|
"#,
        disclaimer = DISCLAIMER,
        lrk_total = fmt_count(summary.lrk_total),
        lrk_active = fmt_count(summary.lrk_active),
        lrk_skipped = fmt_count(summary.lrk_skipped),
        kvk = fmt_count(summary.kvk_numbers),
        bag = fmt_count(summary.bag_postcodes),
        bag_files = fmt_count(summary.bag_files),
        threshold = summary.stacking_threshold,
        active = active,
        inactive = fmt_count(report.inactive_kvk.len()),
        inactive_active = fmt_count(inactive_still_active),
        invalid = fmt_count(report.invalid_addresses.len()),
        invalid_active = fmt_count(invalid_still_active),
        stacked = fmt_count(report.stacking.len()),
        stacked_rows = fmt_count(report.stacking_rows()),
    );

    let mut by_count: BTreeMap<usize, usize> = BTreeMap::new();
    for s in &report.stacking {
        *by_count.entry(s.providers.len()).or_insert(0) += 1;
    }
    for (count, postcodes) in &by_count {
        md.push_str(&format!("| {} | {} |\n", count, postcodes));
    }

    md.push_str(
        r#"
**Provider type distribution in stacking signals:**

| Type | Count |
|------|-------|
"#,
    );
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for p in report.stacking.iter().flat_map(|s| s.providers.iter()) {
        *by_type.entry(p.type_oko.as_str()).or_insert(0) += 1;
    }
    let mut types: Vec<(&str, usize)> = by_type.into_iter().collect();
    types.sort_by(|a, b| b.1.cmp(&a.1));
    for (kind, count) in types {
        md.push_str(&format!("| {} | {} |\n", kind, count));
    }

    md.push_str(
        r#"
## Limitations

1. **KVK status proxy**: The SBI open dataset may not include every active entity.
   Absence from the dataset does not prove dissolution.
2. **Postcode granularity**: A valid postcode does not confirm that a specific
   address exists, and new construction may be missing from the BAG extract.
3. **Guest parent care**: Many guest parent entries have no fixed address in LRK,
   which is normal for that type of care.
4. **Stacking threshold**: The threshold is heuristic. Commercial buildings and
   shared facilities may legitimately house several providers.
5. **Temporal alignment**: LRK, KVK and BAG extracts may have different dates,
   causing false positives.

## Conclusion

Providers that show several signals at once (for example an inactive KVK number
and address stacking) are the strongest candidates for follow-up review.
"#,
    );
    md
}

pub fn write_ghost(writer: &mut ArtifactWriter, summary: &GhostSummary<'_>) -> Result<()> {
    let report = summary.report;
    writer.write_csv(
        INACTIVE_KVK_FILE,
        &INACTIVE_KVK_HEADERS,
        inactive_kvk_rows(&report.inactive_kvk),
    )?;
    writer.write_csv(
        INVALID_ADDRESS_FILE,
        &INVALID_ADDRESS_HEADERS,
        invalid_address_rows(&report.invalid_addresses),
    )?;
    writer.write_csv(STACKING_FILE, &STACKING_HEADERS, stacking_rows(&report.stacking))?;
    writer.write_text(SUMMARY_FILE, &render_ghost_summary(summary))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: &str, kind: &str, status: &str, kvk: &str) -> LrkRecord {
        LrkRecord {
            lrk_id: id.into(),
            type_oko: kind.into(),
            status: status.into(),
            registered_on: "2019-01-01".into(),
            postcode: "1234 ab".into(),
            city: "Utrecht".into(),
            kvk_number: kvk.into(),
            places: "12".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_inactive_row_order() {
        let p = provider("100", "KDV", "Uitgeschreven", "999");
        let row = &inactive_kvk_rows(&[&p])[0];
        assert_eq!(row.len(), INACTIVE_KVK_HEADERS.len());
        assert_eq!(row[0], "100");
        assert_eq!(row[2], "Uitgeschreven");
        assert_eq!(row[5], "999");
        assert_eq!(row[10], "kvk_not_in_active_register");
    }

    #[test]
    fn test_invalid_row_carries_both_postcodes() {
        let p = provider("100", "KDV", "Ingeschreven", "1");
        let invalid = InvalidAddress {
            provider: &p,
            normalized_postcode: "1234AB".into(),
        };
        let row = &invalid_address_rows(&[invalid])[0];
        assert_eq!(row[4], "1234 ab");
        assert_eq!(row[5], "1234AB");
        assert_eq!(row[8], "postcode_not_in_bag");
    }

    #[test]
    fn test_stacking_rows_repeat_postcode_counts() {
        let a = provider("1", "KDV", "Ingeschreven", "1");
        let b = provider("2", "BSO", "Ingeschreven", "1");
        let stacked = StackedPostcode {
            postcode: "1234AB".into(),
            providers: vec![&a, &b],
            unique_kvk_holders: 1,
        };
        let rows = stacking_rows(&[stacked]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][..4], ["1234AB", "2", "1", "2"].map(String::from));
        assert_eq!(rows[1][8], "12");
    }

    #[test]
    fn test_summary_distributions() {
        let a = provider("1", "KDV", "Ingeschreven", "1");
        let b = provider("2", "BSO", "Ingeschreven", "2");
        let c = provider("3", "KDV", "Ingeschreven", "3");
        let d = provider("4", "KDV", "Uitgeschreven", "4");
        let report = GhostProviderReport {
            inactive_kvk: vec![&c, &d],
            invalid_addresses: vec![],
            stacking: vec![StackedPostcode {
                postcode: "1234AB".into(),
                providers: vec![&a, &b, &c],
                unique_kvk_holders: 3,
            }],
            kvk_checked: 4,
            postcodes_checked: 4,
        };
        let md = render_ghost_summary(&GhostSummary {
            lrk_total: 4,
            lrk_active: 3,
            lrk_skipped: 0,
            kvk_numbers: 2,
            bag_postcodes: 10,
            bag_files: 1,
            stacking_threshold: 3,
            active_status: "Ingeschreven",
            report: &report,
        });
        assert!(md.contains(DISCLAIMER));
        assert!(md.contains("- **2** LRK providers have KVK numbers not found"));
        assert!(md.contains("- Of these, **1** are still registered in LRK (status: Ingeschreven)"));
        assert!(md.contains("| 3 | 1 |"));
        assert!(md.contains("| KDV | 2 |\n| BSO | 1 |"));
    }
}

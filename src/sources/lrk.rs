//! Landelijk Register Kinderopvang (childcare register) export
//!
//! `;`-separated, ISO-8859-1 encoded, usually gzip compressed.

use super::delimited::{cell, read_table, Encoding};
use super::{display_name, LoadStats, RecordError, SourceResult};
use std::path::Path;
use tracing::info;

const DELIMITER: u8 = b';';

/// One registered childcare location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrkRecord {
    pub lrk_id: String,
    pub type_oko: String,
    pub status: String,
    pub registered_on: String,
    pub deregistered_on: String,
    /// Postcode as listed, trimmed but not normalized
    pub postcode: String,
    pub city: String,
    pub kvk_number: String,
    pub branch_number: String,
    pub legal_form: String,
    pub places: String,
}

/// Load the register. Rows without an `lrk_id` are skipped.
pub fn load_records(path: &Path) -> SourceResult<(Vec<LrkRecord>, LoadStats)> {
    let table = read_table(path, DELIMITER, Encoding::Latin1)?;
    let lrk_id = Some(table.column("lrk_id")?);
    let type_oko = Some(table.column("type_oko")?);
    let status = Some(table.column("status")?);
    let registered = Some(table.column("inschrijfdatum")?);
    let postcode = Some(table.column("opvanglocatie_postcode")?);
    let city = Some(table.column("opvanglocatie_woonplaats")?);
    let kvk = Some(table.column("kvk_nummer_houder")?);
    let deregistered = table.optional_column("uitschrijfdatum");
    let branch = table.optional_column("vestigingsnummer_houder");
    let legal_form = table.optional_column("rechtsvorm_houder");
    let places = table.optional_column("aantal_kindplaatsen");

    let name = display_name(path);
    let mut stats = LoadStats::default();
    let mut records = Vec::with_capacity(table.len());

    for (i, row) in table.rows().iter().enumerate() {
        let id = cell(row, lrk_id).trim();
        if id.is_empty() {
            stats.skip(&name, i + 2, &RecordError::MissingField("lrk_id".into()));
            continue;
        }
        records.push(LrkRecord {
            lrk_id: id.to_string(),
            type_oko: cell(row, type_oko).to_string(),
            status: cell(row, status).to_string(),
            registered_on: cell(row, registered).to_string(),
            deregistered_on: cell(row, deregistered).to_string(),
            postcode: cell(row, postcode).trim().to_string(),
            city: cell(row, city).trim().to_string(),
            kvk_number: cell(row, kvk).trim().to_string(),
            branch_number: cell(row, branch).trim().to_string(),
            legal_form: cell(row, legal_form).trim().to_string(),
            places: cell(row, places).to_string(),
        });
        stats.accept();
    }

    info!("Loaded {} LRK records from {}", records.len(), name);
    Ok((records, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_optional_columns_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lrk.csv");
        std::fs::write(
            &path,
            "lrk_id;type_oko;status;inschrijfdatum;opvanglocatie_postcode;opvanglocatie_woonplaats;kvk_nummer_houder\n\
             100;KDV;Ingeschreven;2020-01-01;1234 ab ;Utrecht; 12345678\n\
             ;KDV;Ingeschreven;2020-01-01;1234AB;Utrecht;1\n",
        )
        .unwrap();
        let (records, stats) = load_records(&path).unwrap();
        assert_eq!(stats, LoadStats { accepted: 1, skipped: 1 });
        let r = &records[0];
        assert_eq!(r.postcode, "1234 ab");
        assert_eq!(r.kvk_number, "12345678");
        assert_eq!(r.deregistered_on, "");
        assert_eq!(r.places, "");
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lrk.csv");
        std::fs::write(&path, "lrk_id;status\n1;Ingeschreven\n").unwrap();
        assert!(load_records(&path).is_err());
    }
}

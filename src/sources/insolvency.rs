//! Centraal Insolventieregister case dump (JSON lines)
//!
//! Each line holds one case response. The useful part sits at
//! `getCaseResponse.getCaseResult.inspubWebserviceInsolvente.insolvente`.
//! Single-element collections are sometimes serialized as an object
//! instead of an array; both shapes are accepted.

use super::{display_name, open_input, scalar_text, LoadStats, RecordError, SourceResult};
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

const CASE_PATH: [&str; 4] = [
    "getCaseResponse",
    "getCaseResult",
    "inspubWebserviceInsolvente",
    "insolvente",
];

/// One insolvency case linked to a KVK number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsolvencyRecord {
    pub kvk_number: String,
    pub name: String,
    pub case_number: String,
    /// Publication date as published (`YYYY-MM-DD...`), empty when unknown
    pub pronouncement_date: String,
    pub postcode: String,
    pub street: String,
    pub house_number: String,
    pub city: String,
}

impl InsolvencyRecord {
    /// `"<street> <house number>"`, trimmed
    pub fn address(&self) -> String {
        format!("{} {}", self.street, self.house_number)
            .trim()
            .to_string()
    }
}

/// Elements of a value that may be one object or an array of them
fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v @ Value::Object(_)) => vec![v],
        _ => Vec::new(),
    }
}

/// Pronouncement date: the first publication of the pronouncement kind,
/// otherwise the earliest publication date.
fn pronouncement_date(case: &Value, pronouncement_code: &str) -> String {
    let publications = one_or_many(
        case.get("publicatiegeschiedenis")
            .and_then(|h| h.get("publicatie")),
    );

    if let Some(p) = publications
        .iter()
        .find(|p| scalar_text(p.get("publicatieSoortCode")) == pronouncement_code)
    {
        let date = scalar_text(p.get("publicatieDatum"));
        if !date.is_empty() {
            return date;
        }
    }

    publications
        .iter()
        .map(|p| scalar_text(p.get("publicatieDatum")))
        .filter(|d| !d.is_empty())
        .min()
        .unwrap_or_default()
}

/// Parse one JSON line into a record
pub fn parse_line(line: &str, pronouncement_code: &str) -> Result<InsolvencyRecord, RecordError> {
    let root: Value =
        serde_json::from_str(line).map_err(|e| RecordError::Malformed(e.to_string()))?;

    let mut case = &root;
    for segment in CASE_PATH {
        case = case
            .get(segment)
            .ok_or_else(|| RecordError::MissingField(segment.to_string()))?;
    }

    let person = case.get("persoon");
    let kvk_number = scalar_text(person.and_then(|p| p.get("KvKNummer")));
    if kvk_number.is_empty() {
        return Err(RecordError::MissingField("persoon.KvKNummer".into()));
    }

    let address = one_or_many(case.get("adressen").and_then(|a| a.get("adres")))
        .into_iter()
        .next();
    let addr = |field: &str| scalar_text(address.and_then(|a| a.get(field)));

    Ok(InsolvencyRecord {
        kvk_number,
        name: scalar_text(person.and_then(|p| p.get("achternaam"))),
        case_number: scalar_text(case.get("insolventienummer")),
        pronouncement_date: pronouncement_date(case, pronouncement_code),
        postcode: addr("postcode"),
        street: addr("straat"),
        house_number: addr("huisnummer"),
        city: addr("plaats"),
    })
}

/// Load all KVK-linked cases. Lines without a KVK number or with invalid
/// JSON are skipped and counted.
pub fn load_records(
    path: &Path,
    pronouncement_code: &str,
) -> SourceResult<(Vec<InsolvencyRecord>, LoadStats)> {
    let name = display_name(path);
    let reader = BufReader::new(open_input(path)?);
    let mut stats = LoadStats::default();
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line, pronouncement_code) {
            Ok(record) => {
                records.push(record);
                stats.accept();
            }
            Err(e) => stats.skip(&name, i + 1, &e),
        }
    }

    info!(
        "Loaded {} insolvency records with KVK numbers from {} ({} skipped)",
        records.len(),
        name,
        stats.skipped
    );
    Ok((records, stats))
}

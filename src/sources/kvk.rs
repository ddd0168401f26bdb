//! KVK SBI activity register
//!
//! `~`-separated export with a header line:
//! `KVKNUMMER~VESTIGINGNUMMER~ISHOOFDVESTIGING~SBICODE~SBIOMSCHRIJVING~REGISTRATIETIJDSTIP~DATUMAANVANG~ISHOOFDACTIVITEIT`.
//! Several lines may exist per KVK number, one per activity code.

use super::{display_name, open_input, LoadStats, RecordError, SourceResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

const SEPARATOR: char = '~';
const MIN_FIELDS: usize = 8;
const KVK_FIELD: usize = 0;
const SBI_FIELD: usize = 3;
const START_DATE_FIELD: usize = 6;

/// What the register tells about one KVK number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvkProfile {
    /// Earliest valid activity start date, used as registration proxy
    pub earliest_start: Option<NaiveDate>,
    pub sbi_codes: BTreeSet<String>,
}

/// Parse a `YYYYMMDD` date; longer values are cut to eight characters
pub fn parse_register_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.get(..8).unwrap_or(s);
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// Visit every data line (header skipped) as its `~`-separated fields
fn for_each_line<F>(path: &Path, mut visit: F) -> SourceResult<()>
where
    F: FnMut(usize, &[&str]),
{
    let mut reader = BufReader::new(open_input(path)?);
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        if line_no == 1 {
            continue;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        visit(line_no, &fields);
    }
    Ok(())
}

/// Load registration date proxy and activity codes per KVK number.
///
/// Lines with fewer than eight fields are skipped. Unparseable start dates
/// do not take part in the earliest-date choice, and blank activity codes
/// are not recorded.
pub fn load_profiles(path: &Path) -> SourceResult<(BTreeMap<String, KvkProfile>, LoadStats)> {
    let name = display_name(path);
    let mut stats = LoadStats::default();
    let mut profiles: BTreeMap<String, KvkProfile> = BTreeMap::new();

    for_each_line(path, |line_no, fields| {
        if fields.len() < MIN_FIELDS {
            let err = RecordError::Malformed(format!(
                "{} fields, expected {}",
                fields.len(),
                MIN_FIELDS
            ));
            stats.skip(&name, line_no, &err);
            return;
        }
        let kvk = fields[KVK_FIELD].trim();
        if kvk.is_empty() {
            stats.skip(&name, line_no, &RecordError::MissingField("KVKNUMMER".into()));
            return;
        }
        let profile = profiles.entry(kvk.to_string()).or_default();
        if let Some(date) = parse_register_date(fields[START_DATE_FIELD]) {
            profile.earliest_start = Some(match profile.earliest_start {
                Some(current) => current.min(date),
                None => date,
            });
        }
        let code = fields[SBI_FIELD].trim();
        if !code.is_empty() {
            profile.sbi_codes.insert(code.to_string());
        }
        stats.accept();
    })?;

    info!(
        "Loaded {} unique KVK numbers from {} ({} lines skipped)",
        profiles.len(),
        name,
        stats.skipped
    );
    Ok((profiles, stats))
}

/// Load only the set of KVK numbers present in the register
pub fn load_numbers(path: &Path) -> SourceResult<(BTreeSet<String>, LoadStats)> {
    let name = display_name(path);
    let mut stats = LoadStats::default();
    let mut numbers = BTreeSet::new();

    for_each_line(path, |line_no, fields| {
        let kvk = fields.first().map(|f| f.trim()).unwrap_or("");
        if kvk.is_empty() {
            stats.skip(&name, line_no, &RecordError::MissingField("KVKNUMMER".into()));
            return;
        }
        numbers.insert(kvk.to_string());
        stats.accept();
    })?;

    info!("Loaded {} unique KVK numbers from {}", numbers.len(), name);
    Ok((numbers, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "KVKNUMMER~VESTIGINGNUMMER~ISHOOFDVESTIGING~SBICODE~SBIOMSCHRIJVING~REGISTRATIETIJDSTIP~DATUMAANVANG~ISHOOFDACTIVITEIT\n";

    fn write_register(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sbi.csv");
        std::fs::write(&path, format!("{}{}", HEADER, body)).unwrap();
        (dir, path)
    }

    #[test]
    fn test_profiles_take_earliest_date_and_all_codes() {
        let (_dir, path) = write_register(
            "12345678~1~Ja~4120~Bouw~x~20200301~Ja\n\
             12345678~1~Ja~4399~Overig~x~20190115~Nee\n\
             87654321~2~Ja~5610~Horeca~x~~Ja\n\
             short~line\n",
        );
        let (profiles, stats) = load_profiles(&path).unwrap();
        assert_eq!(stats, LoadStats { accepted: 3, skipped: 1 });

        let p = &profiles["12345678"];
        assert_eq!(p.earliest_start, NaiveDate::from_ymd_opt(2019, 1, 15));
        assert_eq!(
            p.sbi_codes.iter().cloned().collect::<Vec<_>>(),
            vec!["4120".to_string(), "4399".to_string()]
        );
        // Empty start date leaves the proxy undefined
        assert_eq!(profiles["87654321"].earliest_start, None);
    }

    #[test]
    fn test_numbers_use_first_field_only() {
        let (_dir, path) = write_register("111~a\n222~1~Ja~4120~Bouw~x~20200301~Ja\n\n");
        let (numbers, _) = load_numbers(&path).unwrap();
        assert!(numbers.contains("111"));
        assert!(numbers.contains("222"));
        assert_eq!(numbers.len(), 2);
    }

    #[test]
    fn test_parse_register_date() {
        assert_eq!(
            parse_register_date("20210704120000"),
            NaiveDate::from_ymd_opt(2021, 7, 4)
        );
        assert_eq!(parse_register_date("2021-07-04"), None);
        assert_eq!(parse_register_date(""), None);
    }

    #[test]
    fn test_blank_activity_code_is_not_a_code() {
        let (_dir, path) = write_register(
            "12345678~1~Ja~ ~Onbekend~x~20200301~Ja\n\
             12345678~1~Ja~4120~Bouw~x~20200301~Nee\n\
             87654321~1~Ja~~Onbekend~x~20190101~Ja\n",
        );
        let (profiles, stats) = load_profiles(&path).unwrap();
        assert_eq!(stats.accepted, 3);
        assert_eq!(
            profiles["12345678"].sbi_codes.iter().cloned().collect::<Vec<_>>(),
            vec!["4120".to_string()]
        );
        assert!(profiles["87654321"].sbi_codes.is_empty());
    }
}

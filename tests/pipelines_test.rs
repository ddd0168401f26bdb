//! End-to-end pipeline tests
//!
//! Each test builds small input files in a temp directory, runs the
//! binary and checks the artifacts it writes.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn registerscan_bin() -> String {
    env!("CARGO_BIN_EXE_registerscan").to_string()
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(registerscan_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("REGISTERSCAN_CONFIG")
        .output()
        .expect("Failed to run registerscan")
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "registerscan {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn write_gz(path: &Path, content: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn read_all(dir: &Path, names: &[&str]) -> Vec<Vec<u8>> {
    names
        .iter()
        .map(|n| std::fs::read(dir.join(n)).unwrap())
        .collect()
}

// ============================================================================
// subsidy-trends
// ============================================================================

const LEDGER_HEADER: &str = "Begrotingsnaam;Regeling;Instrument;Begrotingsjaar;Bedrag (x1000)\n";

fn write_ledger(dir: &Path) -> PathBuf {
    let mut body = String::from(LEDGER_HEADER);
    for (year, amount) in (2016..=2023).zip([2000, 2000, 2000, 2000, 2000, 2000, 2000, 20000]) {
        body.push_str(&format!("Onderwijs;Beurzen;Subsidie;{};{}\n", year, amount));
    }
    for year in 2016..=2023 {
        body.push_str(&format!("Zorg;Preventie;Opdracht;{};5000,5\n", year));
    }
    body.push_str("Zorg;Preventie;Opdracht;onbekend;10\n");
    let path = dir.join("instruments.csv.gz");
    write_gz(&path, &body);
    path
}

#[test]
fn test_subsidy_trends_writes_tables_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    write_ledger(dir.path());
    let stdout = run_ok(dir.path(), &["subsidy-trends", "instruments.csv.gz", "-o", "out"]);
    let out = dir.path().join("out");

    let (headers, rows) = read_csv(&out.join("subsidy-growth-anomalies.csv"));
    assert_eq!(
        &headers[..5],
        &["budget_name", "regeling", "instrument", "year", "amount_k"]
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][..5], &["Onderwijs", "Beurzen", "Subsidie", "2023", "20000"]);

    let (_, rows) = read_csv(&out.join("budget-vs-actual-outliers.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], "2023");

    let summary = std::fs::read_to_string(out.join("subsidy-trends-summary.md")).unwrap();
    assert!(summary.contains("Onderwijs"));

    assert!(stdout.contains("subsidy-growth-anomalies.csv: sha256="));
    assert!(stdout.contains("subsidy-trends-summary.md: sha256="));
}

#[test]
fn test_subsidy_trends_reruns_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_ledger(dir.path());
    let names = [
        "subsidy-growth-anomalies.csv",
        "budget-vs-actual-outliers.csv",
        "subsidy-trends-summary.md",
    ];

    run_ok(dir.path(), &["subsidy-trends", "instruments.csv.gz", "-o", "a"]);
    run_ok(dir.path(), &["subsidy-trends", "instruments.csv.gz", "-o", "b"]);
    assert_eq!(
        read_all(&dir.path().join("a"), &names),
        read_all(&dir.path().join("b"), &names)
    );
}

#[test]
fn test_subsidy_trends_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["subsidy-trends", "nope.csv", "-o", "out"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_subsidy_trends_missing_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.csv"), "a;b\n1;2\n").unwrap();
    let output = run(dir.path(), &["subsidy-trends", "bad.csv", "-o", "out"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Begrotingsnaam"));
}

// ============================================================================
// insolvency
// ============================================================================

const KVK_HEADER: &str = "KVKNUMMER~VESTIGINGNUMMER~ISHOOFDVESTIGING~SBICODE~SBIOMSCHRIJVING~REGISTRATIETIJDSTIP~DATUMAANVANG~ISHOOFDACTIVITEIT\n";

fn case_line(kvk: &str, name: &str, case: &str, postcode: &str, date: &str) -> String {
    json!({"getCaseResponse": {"getCaseResult": {"inspubWebserviceInsolvente": {"insolvente": {
        "insolventienummer": case,
        "persoon": {"KvKNummer": kvk, "achternaam": name},
        "adressen": {"adres": {"postcode": postcode, "straat": "Kade", "huisnummer": "1", "plaats": "Delft"}},
        "publicatiegeschiedenis": {"publicatie": [
            {"publicatieDatum": date, "publicatieSoortCode": "1300"}
        ]}
    }}}}})
    .to_string()
}

fn write_insolvency_inputs(dir: &Path) {
    write_gz(
        &dir.join("sbi.csv.gz"),
        &format!(
            "{}{}{}{}",
            KVK_HEADER,
            "11111111~1~Ja~4120~Bouw~x~20200101~Ja\n",
            "22222222~1~Ja~4120~Bouw~x~20100101~Ja\n",
            "33333333~1~Ja~5610~Horeca~x~20150101~Ja\n",
        ),
    );
    let lines = [
        case_line("11111111", "Bouwbedrijf Jansen B.V.", "F.10/21/1", "2611 AB", "2021-03-01"),
        case_line("22222222", "Bouwbedrijf Jansen Holding B.V.", "F.10/21/2", "2611AB", "2021-06-01"),
        case_line("33333333", "Cafe De Hoek", "F.10/21/3", "9999ZZ", "2021-06-01"),
        "not json".to_string(),
    ];
    std::fs::write(dir.join("cases.jsonl"), lines.join("\n") + "\n").unwrap();
}

#[test]
fn test_insolvency_rapid_and_phoenix() {
    let dir = tempfile::tempdir().unwrap();
    write_insolvency_inputs(dir.path());
    run_ok(
        dir.path(),
        &["insolvency", "--kvk", "sbi.csv.gz", "--insolvency", "cases.jsonl", "-o", "out"],
    );
    let out = dir.path().join("out");

    let (headers, rows) = read_csv(&out.join("rapid-insolvency-entities.csv"));
    assert_eq!(headers[0], "kvk_number");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "11111111");
    assert_eq!(rows[0][2], "2020-01-01");
    assert_eq!(rows[0][4], "425");

    let (headers, rows) = read_csv(&out.join("phoenix-signal-clusters.csv"));
    assert_eq!(headers.len(), 12);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "2611AB");
    assert_eq!(rows[0][9], "4120");
    assert!(rows[0][10].starts_with("same_postcode;shared_sbi"));

    assert!(out.join("phoenix-analysis-summary.md").is_file());
}

#[test]
fn test_insolvency_rapid_days_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    write_insolvency_inputs(dir.path());
    run_ok(
        dir.path(),
        &[
            "insolvency",
            "--kvk",
            "sbi.csv.gz",
            "--insolvency",
            "cases.jsonl",
            "--rapid-days",
            "365",
            "-o",
            "out",
        ],
    );
    let (_, rows) = read_csv(&dir.path().join("out/rapid-insolvency-entities.csv"));
    assert!(rows.is_empty());
}

// ============================================================================
// ghost-providers
// ============================================================================

fn write_bag(path: &Path, postcodes: &[&str]) {
    let mut inner = ZipWriter::new(Cursor::new(Vec::new()));
    inner
        .start_file("9999NUM01.xml", SimpleFileOptions::default())
        .unwrap();
    for postcode in postcodes {
        write!(
            inner,
            "<Objecten:Nummeraanduiding><Objecten:postcode>{}</Objecten:postcode></Objecten:Nummeraanduiding>",
            postcode
        )
        .unwrap();
    }
    let inner_bytes = inner.finish().unwrap().into_inner();

    let mut outer = ZipWriter::new(std::fs::File::create(path).unwrap());
    outer
        .start_file("Leveringsdocument.xml", SimpleFileOptions::default())
        .unwrap();
    outer.write_all(b"<levering/>").unwrap();
    outer
        .start_file("9999NUM01012025.zip", SimpleFileOptions::default())
        .unwrap();
    outer.write_all(&inner_bytes).unwrap();
    outer.finish().unwrap();
}

fn write_ghost_inputs(dir: &Path) {
    let header = "lrk_id;type_oko;status;inschrijfdatum;uitschrijfdatum;opvanglocatie_postcode;opvanglocatie_woonplaats;kvk_nummer_houder;aantal_kindplaatsen\n";
    let rows = [
        "1;KDV;Ingeschreven;2019-01-01;;1234 AB;Utrecht;11111111;16",
        "2;BSO;Ingeschreven;2019-01-01;;1234AB;Utrecht;11111111;20",
        "3;VGO;Ingeschreven;2020-01-01;;1234ab;Utrecht;99999999;4",
        "4;KDV;Uitgeschreven;2015-01-01;2018-01-01;5678CD;Zeist;;12",
        "5;KDV;Ingeschreven;2021-01-01;;0000XX;Nergens;11111111;8",
    ];
    let mut body = String::from(header);
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    write_gz(&dir.join("lrk.csv.gz"), &body);
    std::fs::write(
        dir.join("sbi.csv"),
        format!("{}11111111~1~Ja~8891~Kinderopvang~x~20100101~Ja\n", KVK_HEADER),
    )
    .unwrap();
    write_bag(&dir.join("bag.zip"), &["1234AB", "5678CD"]);
}

#[test]
fn test_ghost_providers_signals() {
    let dir = tempfile::tempdir().unwrap();
    write_ghost_inputs(dir.path());
    run_ok(
        dir.path(),
        &[
            "ghost-providers",
            "--lrk",
            "lrk.csv.gz",
            "--kvk",
            "sbi.csv",
            "--bag",
            "bag.zip",
            "-o",
            "out",
        ],
    );
    let out = dir.path().join("out");

    let (_, rows) = read_csv(&out.join("lrk-inactive-kvk.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "3");
    assert_eq!(rows[0][10], "kvk_not_in_active_register");

    let (_, rows) = read_csv(&out.join("lrk-invalid-address.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "5");
    assert_eq!(rows[0][5], "0000XX");

    let (headers, rows) = read_csv(&out.join("lrk-address-stacking.csv"));
    assert_eq!(headers[1], "provider_count_at_postcode");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r[0] == "1234AB" && r[1] == "3" && r[2] == "2"));

    assert!(out.join("ghost-provider-summary.md").is_file());
}

#[test]
fn test_ghost_providers_unknown_inner_archive_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_ghost_inputs(dir.path());
    let output = run(
        dir.path(),
        &[
            "ghost-providers",
            "--lrk",
            "lrk.csv.gz",
            "--kvk",
            "sbi.csv",
            "--bag",
            "bag.zip",
            "--bag-inner",
            "missing.zip",
            "-o",
            "out",
        ],
    );
    assert!(!output.status.success());
}

// ============================================================================
// thresholds
// ============================================================================

fn release(amount: serde_json::Value) -> serde_json::Value {
    json!({"ocid": "ocds-x", "awards": [{"value": {"amount": amount, "currency": "EUR"}}]})
}

fn write_releases(dir: &Path) -> PathBuf {
    let data = dir.join("tenderned");
    std::fs::create_dir(&data).unwrap();
    let mut releases: Vec<_> = (0..8).map(|_| release(json!(215000))).collect();
    releases.push(release(json!("50000,00")));
    releases.push(json!({"ocid": "no-award"}));
    std::fs::write(
        data.join("package-1.json"),
        json!({"releases": releases}).to_string(),
    )
    .unwrap();
    write_gz(
        &data.join("single.json.gz"),
        &release(json!(10000)).to_string(),
    );
    std::fs::write(data.join("notes.txt"), "ignored").unwrap();
    data
}

#[test]
fn test_thresholds_concentration_below_services_threshold() {
    let dir = tempfile::tempdir().unwrap();
    write_releases(dir.path());
    run_ok(dir.path(), &["thresholds", "tenderned", "-o", "out"]);
    let out = dir.path().join("out");

    let (_, rows) = read_csv(&out.join("threshold-anomalies-services.csv"));
    assert_eq!(
        rows,
        vec![vec!["services", "95-99%", "8", "0.77", "10.40", "concentration", "high"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()]
    );

    let (_, rows) = read_csv(&out.join("threshold-hhi-services.csv"));
    assert!(rows.iter().any(|r| r.contains(&"6400.00".to_string())));

    for name in [
        "threshold-distribution.csv",
        "threshold-distribution-works.csv",
        "threshold-anomalies-works.csv",
        "threshold-hhi-works.csv",
        "threshold-analysis-summary.md",
    ] {
        assert!(out.join(name).is_file(), "{} missing", name);
    }
}

#[test]
fn test_thresholds_manifest_lists_files_in_write_order() {
    let dir = tempfile::tempdir().unwrap();
    write_releases(dir.path());
    let stdout = run_ok(dir.path(), &["thresholds", "tenderned", "-o", "out"]);

    let names: Vec<&str> = stdout
        .lines()
        .filter(|l| l.contains(": sha256="))
        .filter_map(|l| l.trim().split(':').next())
        .collect();
    assert_eq!(
        names,
        vec![
            "threshold-distribution.csv",
            "threshold-distribution-works.csv",
            "threshold-anomalies-services.csv",
            "threshold-anomalies-works.csv",
            "threshold-hhi-services.csv",
            "threshold-hhi-works.csv",
            "threshold-analysis-summary.md",
        ]
    );
    for line in stdout.lines().filter(|l| l.contains(": sha256=")) {
        let hex = line.split("sha256=").nth(1).unwrap().split(' ').next().unwrap();
        assert_eq!(hex.len(), 64);
        assert!(line.contains(" size="));
    }
}

#[test]
fn test_thresholds_empty_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("empty")).unwrap();
    let output = run(dir.path(), &["thresholds", "empty", "-o", "out"]);
    assert!(!output.status.success());
}

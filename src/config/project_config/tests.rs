use super::*;

#[test]
fn test_default_config() {
    let config = RegisterscanConfig::default();

    assert!((config.series.z_threshold - 2.0).abs() < 0.001);
    assert!((config.series.deviation_threshold - 0.25).abs() < 0.001);
    assert_eq!(config.series.rolling_window, 3);
    assert_eq!(config.series.min_years, 4);
    assert_eq!(config.subsidy.key_columns.len(), 3);
    assert_eq!(config.subsidy.delimiter_byte().unwrap(), b';');
    assert_eq!(config.insolvency.rapid_days, 1095);
    assert_eq!(config.insolvency.pronouncement_code, "1300");
    assert_eq!(config.childcare.stacking_threshold, 3);
    assert!(config.childcare.bag_inner_archive.is_none());
    assert!((config.procurement.services_threshold - 221_000.0).abs() < 0.001);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_toml_config() {
    let toml_content = r#"
[series]
z_threshold = 2.5
min_years = 5

[subsidy]
key_columns = ["Regeling"]
amount_column = "Bedrag"
delimiter = "tab"

[insolvency]
rapid_days = 730

[childcare]
bag_inner_archive = "9999NUM08012025.zip"

[procurement]
bandwidth = 0.1
"#;

    let config: RegisterscanConfig = toml::from_str(toml_content).expect("parse config");

    // Given values
    assert!((config.series.z_threshold - 2.5).abs() < 0.001);
    assert_eq!(config.series.min_years, 5);
    assert_eq!(config.subsidy.key_columns, vec!["Regeling"]);
    assert_eq!(config.subsidy.delimiter_byte().unwrap(), b'\t');
    assert_eq!(config.insolvency.rapid_days, 730);
    assert_eq!(
        config.childcare.bag_inner_archive.as_deref(),
        Some("9999NUM08012025.zip")
    );

    // Missing keys keep their defaults
    assert_eq!(config.series.rolling_window, 3);
    assert_eq!(config.subsidy.year_column, "Begrotingsjaar");
    assert!((config.insolvency.name_similarity - 0.6).abs() < 0.001);
    assert_eq!(config.childcare.active_status, "Ingeschreven");
    assert!((config.procurement.works_threshold - 5_538_000.0).abs() < 0.001);
}

#[test]
fn test_engine_config_from_series() {
    let config: RegisterscanConfig =
        toml::from_str("[series]\nmin_baseline = 0.0\n").expect("parse config");
    let engine = config.series.engine_config();
    assert_eq!(engine.min_baseline, 0.0);
    assert_eq!(engine.rolling_window, 3);
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = RegisterscanConfig::default();
    config.subsidy.delimiter = ";;".into();
    assert!(config.validate().is_err());

    let mut config = RegisterscanConfig::default();
    config.procurement.bandwidth = 1.5;
    assert!(config.validate().is_err());

    let mut config = RegisterscanConfig::default();
    config.insolvency.name_similarity = 1.2;
    assert!(config.validate().is_err());

    let mut config = RegisterscanConfig::default();
    config.series.z_threshold = f64::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn test_load_config_prefers_toml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(TOML_CONFIG_FILE),
        "[insolvency]\nrapid_days = 100\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join(JSON_CONFIG_FILE),
        r#"{"insolvency": {"rapid_days": 200}}"#,
    )
    .unwrap();

    assert_eq!(load_config(dir.path()).insolvency.rapid_days, 100);
}

#[test]
fn test_load_config_falls_back_to_json_then_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(TOML_CONFIG_FILE), "not [valid toml").unwrap();
    std::fs::write(
        dir.path().join(JSON_CONFIG_FILE),
        r#"{"childcare": {"stacking_threshold": 5}}"#,
    )
    .unwrap();
    assert_eq!(load_config(dir.path()).childcare.stacking_threshold, 5);

    let empty = tempfile::tempdir().unwrap();
    assert_eq!(load_config(empty.path()), RegisterscanConfig::default());
}

#[test]
fn test_explicit_config_file_errors_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("custom.toml");
    std::fs::write(&bad, "[series]\nz_threshold = \"high\"\n").unwrap();
    assert!(load_config_file(&bad).is_err());
    assert!(load_config_file(&dir.path().join("missing.toml")).is_err());

    let json = dir.path().join("custom.json");
    std::fs::write(&json, r#"{"procurement": {"bandwidth": 0.02}}"#).unwrap();
    let config = load_config_file(&json).unwrap();
    assert!((config.procurement.bandwidth - 0.02).abs() < 1e-9);
}

#[test]
fn test_toml_output_parses_back() {
    let mut config = RegisterscanConfig::default();
    config.childcare.bag_inner_archive = Some("inner.zip".into());
    let rendered = config.to_toml().unwrap();
    assert!(rendered.contains("[procurement]"));
    let parsed: RegisterscanConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, config);
}

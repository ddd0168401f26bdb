//! TenderNed procurement releases (OCDS JSON)
//!
//! Each file is either a package with a `releases` array or a single
//! release. The contract value is read from the first award.

use super::{display_name, open_input, LoadStats, RecordError, SourceError, SourceResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// Whether a file name looks like a release file (`.json` or `.json.gz`)
fn is_release_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".json") || name.ends_with(".json.gz")
}

/// Expand the given paths: files are kept, directories contribute their
/// release files. The result is sorted and de-duplicated.
pub fn collect_files(inputs: &[PathBuf]) -> SourceResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in std::fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && is_release_file(&path) {
                    files.push(path);
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();
    if files.is_empty() {
        let shown = inputs.first().cloned().unwrap_or_default();
        return Err(SourceError::NoInput(shown));
    }
    Ok(files)
}

/// Contract value of one release: `awards[0].value.amount`.
///
/// Amounts may be numbers or strings with a comma decimal separator. The
/// value object may also be a bare number. Non-positive values are rejected.
pub fn contract_value(release: &Value) -> Result<f64, RecordError> {
    let value = release
        .get("awards")
        .and_then(|a| a.get(0))
        .and_then(|a| a.get("value"))
        .ok_or_else(|| RecordError::MissingField("awards[0].value".into()))?;

    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(_) => match value.get("amount") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => return Err(RecordError::MissingField("awards[0].value.amount".into())),
        },
        _ => None,
    };

    match amount {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(RecordError::Invalid {
            field: "contract value".into(),
            value: value.to_string(),
        }),
    }
}

/// Releases contained in one parsed file
fn releases(doc: Value) -> Vec<Value> {
    match doc {
        Value::Object(mut map) => match map.remove("releases") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("releases".into(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Load positive contract values from release files, as listed by
/// [`collect_files`]
pub fn load_values(files: &[PathBuf]) -> SourceResult<(Vec<f64>, LoadStats)> {
    let mut stats = LoadStats::default();
    let mut values = Vec::new();

    for path in files {
        let name = display_name(path);
        let doc: Value = serde_json::from_reader(open_input(path)?)?;
        for (i, release) in releases(doc).iter().enumerate() {
            match contract_value(release) {
                Ok(v) => {
                    values.push(v);
                    stats.accept();
                }
                Err(e) => stats.skip(&name, i, &e),
            }
        }
        info!("Loaded {}", name);
    }

    info!(
        "{} contract values from {} files ({} releases without a usable value)",
        values.len(),
        files.len(),
        stats.skipped
    );
    Ok((values, stats))
}

//! BAG address register extract
//!
//! The national extract is a zip archive holding further zip archives, one
//! per object type. The address (nummeraanduiding) archive contains XML
//! fragments; only the set of postcodes is needed, so the XML is scanned
//! for postcode elements instead of being parsed.

use super::{display_name, SourceError, SourceResult};
use indicatif::{ProgressBar, ProgressStyle};
use regex::bytes::Regex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

const POSTCODE_PATTERN: &str = r"<Objecten:postcode>(\w+)</Objecten:postcode>";

/// Postcodes that exist in the BAG extract
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BagPostcodes {
    pub postcodes: BTreeSet<String>,
    /// Number of XML fragments scanned
    pub files_scanned: usize,
}

impl BagPostcodes {
    pub fn contains(&self, postcode: &str) -> bool {
        self.postcodes.contains(postcode)
    }

    pub fn len(&self) -> usize {
        self.postcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postcodes.is_empty()
    }
}

/// Names of all entries, sorted
fn sorted_names<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn is_xml(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".xml")
}

fn is_zip(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".zip")
}

fn progress_bar(len: usize) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ");
    let bar = ProgressBar::new(len as u64);
    bar.set_style(style);
    bar.set_message("scanning BAG fragments");
    bar
}

/// Scan every XML entry of an archive for postcode elements
fn scan_archive<R: Read + Seek>(archive: &mut ZipArchive<R>) -> SourceResult<BagPostcodes> {
    let pattern = Regex::new(POSTCODE_PATTERN)?;
    let names: Vec<String> = sorted_names(archive)
        .into_iter()
        .filter(|n| is_xml(n))
        .collect();

    let bar = progress_bar(names.len());
    let mut result = BagPostcodes::default();
    let mut content = Vec::new();

    for name in &names {
        content.clear();
        archive.by_name(name)?.read_to_end(&mut content)?;
        for caps in pattern.captures_iter(&content) {
            if let Some(m) = caps.get(1) {
                result
                    .postcodes
                    .insert(String::from_utf8_lossy(m.as_bytes()).into_owned());
            }
        }
        result.files_scanned += 1;
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(result)
}

/// Extract the set of postcodes from a BAG archive.
///
/// `inner` names the nested address archive. Without it the first nested
/// `.zip` entry (by name) is used; if there is none, the XML entries of the
/// outer archive are scanned directly.
pub fn load_postcodes(path: &Path, inner: Option<&str>) -> SourceResult<BagPostcodes> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut outer = ZipArchive::new(file)?;

    let inner_name = match inner {
        Some(name) => {
            if outer.index_for_name(name).is_none() {
                return Err(SourceError::MissingEntry(format!(
                    "{} in {}",
                    name,
                    display_name(path)
                )));
            }
            Some(name.to_string())
        }
        None => sorted_names(&outer).into_iter().find(|n| is_zip(n)),
    };

    let result = match inner_name {
        Some(name) => {
            debug!("Reading nested archive {}", name);
            let mut bytes = Vec::new();
            outer.by_name(&name)?.read_to_end(&mut bytes)?;
            let mut nested = ZipArchive::new(Cursor::new(bytes))?;
            scan_archive(&mut nested)?
        }
        None => scan_archive(&mut outer)?,
    };

    info!(
        "Extracted {} unique postcodes from {} XML files in {}",
        result.len(),
        result.files_scanned,
        display_name(path)
    );
    Ok(result)
}

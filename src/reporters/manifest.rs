//! SHA-256 manifest of written artifacts

use anyhow::{Context, Result};
use console::style;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// File name without directory
    pub name: String,
    /// Lowercase hex digest
    pub sha256: String,
    pub size: u64,
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: sha256={} size={}", self.name, self.sha256, self.size)
    }
}

/// Hash a file by streaming it through the digest
pub fn digest_file(path: &Path) -> Result<ManifestEntry> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(ManifestEntry {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        sha256: format!("{:x}", hasher.finalize()),
        size,
    })
}

/// One entry per path, in the given order
pub fn build_manifest(paths: &[PathBuf]) -> Result<Vec<ManifestEntry>> {
    paths.iter().map(|p| digest_file(p)).collect()
}

pub fn print_manifest(entries: &[ManifestEntry]) {
    println!("\n{}", style("Manifest").bold());
    for entry in entries {
        println!(
            "  {}: sha256={} size={}",
            style(&entry.name).cyan(),
            entry.sha256,
            entry.size
        );
    }
}

//! Writing generated documents to disk
//!
//! Each document lands in `{dir}/{prefix}{unit}.docx`. Unit names come
//! straight from the spreadsheet, so characters that are not portable in
//! file names are replaced with `_`.

use anyhow::{bail, Context, Result};
use sheetdoc_core::GeneratedBatch;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Portable file stem for a unit name
pub fn file_stem(unit: &str) -> String {
    let stem: String = unit
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let stem = stem.trim().trim_end_matches('.');
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem.to_string()
    }
}

/// Output path of every document, in batch order
pub fn output_paths<T>(batch: &GeneratedBatch<T>, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut paths = Vec::with_capacity(batch.len());

    for unit in batch.units() {
        let name = format!("{prefix}{}.docx", file_stem(unit));
        if !seen.insert(name.to_lowercase()) {
            bail!("units {unit:?} and another unit map to the same file name {name:?}");
        }
        paths.push(dir.join(name));
    }
    Ok(paths)
}

/// Write every document of a batch; returns the written paths
pub fn write_batch(batch: &GeneratedBatch<Vec<u8>>, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let paths = output_paths(batch, dir, prefix)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    for (doc, path) in batch.iter().zip(&paths) {
        std::fs::write(path, &doc.document)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(unit = %doc.unit, path = %path.display(), "document written");
    }
    Ok(paths)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit repository discovery and archive installation

use crate::archive::{read_archive, UnitArchive, UNIT_EXTENSION};
use crate::error::ManifestError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from repository scanning and archive installation
#[derive(Debug, Error)]
pub enum FindError {
    #[error("archive {0} already exists in the repository")]
    AlreadyExists(PathBuf),
    #[error("'{0}' is not a valid archive file name")]
    InvalidFileName(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An archive excluded from discovery, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArchive {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a repository scan: archives that parsed, in scan order, and
/// archives that were skipped.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub units: Vec<UnitArchive>,
    pub skipped: Vec<SkippedArchive>,
}

impl DiscoveryReport {
    fn push(&mut self, path: &Path, result: Result<UnitArchive, ManifestError>, seen: &mut HashSet<String>) {
        match result {
            Ok(archive) => {
                let id = archive.descriptor.id.to_string();
                if seen.insert(id.clone()) {
                    self.units.push(archive);
                } else {
                    tracing::warn!(path = %path.display(), unit_id = %id, "skipping duplicate unit");
                    self.skipped.push(SkippedArchive {
                        path: path.to_path_buf(),
                        reason: format!("duplicate unit id '{id}'"),
                    });
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid unit archive");
                self.skipped.push(SkippedArchive { path: path.to_path_buf(), reason: e.to_string() });
            }
        }
    }
}

/// Create the repository directory if it does not exist.
pub fn ensure_repository(dir: &Path) -> Result<(), FindError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        tracing::info!(path = %dir.display(), "created unit repository");
    }
    Ok(())
}

/// List `.unit` files directly inside `dir`, sorted by file name.
pub fn collect_unit_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_file() && is_unit_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Scan the repository directory (creating it if absent) and decode every
/// archive in it. Malformed archives and duplicate ids are skipped.
pub fn discover(dir: &Path) -> Result<DiscoveryReport, FindError> {
    ensure_repository(dir)?;
    let mut report = DiscoveryReport::default();
    let mut seen = HashSet::new();
    for path in collect_unit_files(dir)? {
        let result = read_archive(&path);
        report.push(&path, result, &mut seen);
    }
    tracing::debug!(
        path = %dir.display(),
        units = report.units.len(),
        skipped = report.skipped.len(),
        "discovered units"
    );
    Ok(report)
}

/// Decode an explicit list of archives instead of scanning a directory.
pub fn discover_paths(paths: &[PathBuf]) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    let mut seen = HashSet::new();
    for path in paths {
        let result = read_archive(path);
        report.push(path, result, &mut seen);
    }
    report
}

/// Validate `bytes` as a unit archive and write them into the repository
/// as `file_name`. An existing file is never overwritten.
pub fn install_archive(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<UnitArchive, FindError> {
    let valid_name = !file_name.is_empty()
        && !file_name.contains(['/', '\\'])
        && file_name != ".."
        && is_unit_file(Path::new(file_name));
    if !valid_name {
        return Err(FindError::InvalidFileName(file_name.to_string()));
    }

    ensure_repository(dir)?;
    let path = dir.join(file_name);
    if path.exists() {
        return Err(FindError::AlreadyExists(path));
    }

    let archive = UnitArchive::from_bytes(&path, bytes)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, &path)?;
    tracing::info!(path = %path.display(), unit_id = %archive.descriptor.id, "installed unit archive");
    Ok(archive)
}

/// Delete an archive from disk. A missing file is not an error.
pub fn remove_archive(path: &Path) -> Result<(), FindError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed unit archive");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_unit_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(UNIT_EXTENSION)
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reading `.unit` archives (gzip-compressed tar).
//!
//! Layout:
//! - `unit.toml`: the descriptor
//! - `classes/a/b/Name.class`: code symbol `a.b.Name`
//! - anything else: a resource addressed by its archive path

use crate::descriptor::{parse_descriptor, UnitDescriptor};
use crate::error::ManifestError;
use flate2::read::GzDecoder;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// File extension of unit archives.
pub const UNIT_EXTENSION: &str = "unit";

/// Archive entry holding the descriptor.
pub const DESCRIPTOR_ENTRY: &str = "unit.toml";

/// Archive directory whose entries are code symbols.
pub const SYMBOL_DIR: &str = "classes/";

const SYMBOL_SUFFIX: &str = ".class";

/// Upper bound on archive size, compressed and expanded.
const MAX_ARCHIVE_SIZE: usize = 64 * 1024 * 1024;

/// Decoded contents of one unit archive.
#[derive(Debug, Clone)]
pub struct UnitArchive {
    pub descriptor: UnitDescriptor,
    /// Fully-qualified code symbols, sorted
    pub symbols: BTreeSet<String>,
    /// Resources keyed by archive path (descriptor and symbols excluded)
    pub resources: BTreeMap<String, Vec<u8>>,
}

impl UnitArchive {
    /// Decode an archive already held in memory. `path` is recorded as the
    /// descriptor's archive location and used in error messages.
    pub fn from_bytes(path: &Path, data: &[u8]) -> Result<Self, ManifestError> {
        let malformed = |message: String| ManifestError::MalformedArchive {
            path: path.to_path_buf(),
            message,
        };

        if data.len() > MAX_ARCHIVE_SIZE {
            return Err(malformed(format!(
                "archive too large: {} bytes (max {MAX_ARCHIVE_SIZE})",
                data.len()
            )));
        }

        let mut expanded = Vec::new();
        GzDecoder::new(data)
            .take(MAX_ARCHIVE_SIZE as u64 + 1)
            .read_to_end(&mut expanded)
            .map_err(|e| malformed(format!("failed to decompress: {e}")))?;
        if expanded.len() > MAX_ARCHIVE_SIZE {
            return Err(malformed("expanded archive exceeds size limit".to_string()));
        }

        let mut archive = Archive::new(expanded.as_slice());
        let mut descriptor: Option<UnitDescriptor> = None;
        let mut symbols = BTreeSet::new();
        let mut resources = BTreeMap::new();

        let entries = archive.entries().map_err(|e| malformed(format!("invalid tar: {e}")))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| malformed(format!("invalid entry: {e}")))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let entry_path = entry
                .path()
                .map_err(|e| malformed(format!("invalid entry path: {e}")))?
                .into_owned();
            let name = normalize_entry(&entry_path)
                .ok_or_else(|| malformed(format!("unsafe entry path {}", entry_path.display())))?;

            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| malformed(format!("failed to read {name}: {e}")))?;

            if name == DESCRIPTOR_ENTRY {
                let text = String::from_utf8(content)
                    .map_err(|_| malformed("unit.toml is not valid UTF-8".to_string()))?;
                let mut parsed = parse_descriptor(&text)?;
                parsed.archive = path.to_path_buf();
                descriptor = Some(parsed);
            } else if let Some(symbol) = symbol_name(&name) {
                symbols.insert(symbol);
            } else {
                resources.insert(name, content);
            }
        }

        let descriptor =
            descriptor.ok_or_else(|| ManifestError::MissingDescriptor(path.to_path_buf()))?;
        Ok(Self { descriptor, symbols, resources })
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }
}

/// Read and decode the archive at `path`.
pub fn read_archive(path: &Path) -> Result<UnitArchive, ManifestError> {
    let data = std::fs::read(path)
        .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
    UnitArchive::from_bytes(path, &data)
}

/// Forward-slash entry name, or `None` when the path escapes the archive root.
fn normalize_entry(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn symbol_name(entry: &str) -> Option<String> {
    let rest = entry.strip_prefix(SYMBOL_DIR)?;
    let stem = rest.strip_suffix(SYMBOL_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('/', "."))
}

/// Path-form of a symbol name, as stored in an archive.
#[cfg(any(test, feature = "test-support"))]
pub(crate) fn symbol_entry(symbol: &str) -> PathBuf {
    PathBuf::from(format!("{SYMBOL_DIR}{}{SYMBOL_SUFFIX}", symbol.replace('.', "/")))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;

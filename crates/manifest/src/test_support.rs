// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders for unit archives used in tests across the workspace.

use crate::archive::{symbol_entry, DESCRIPTOR_ENTRY, UNIT_EXTENSION};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};

/// Assembles a `.unit` archive in memory.
///
/// ```ignore
/// let bytes = ArchiveBuilder::new("ui", "1.0")
///     .activator("ui.Activator")
///     .symbol("ui.Activator")
///     .resource("messages.properties", "hello=Hello")
///     .bytes();
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    id: String,
    name: String,
    version: String,
    unit_lines: Vec<String>,
    tables: Vec<String>,
    symbols: Vec<String>,
    resources: Vec<(String, Vec<u8>)>,
    raw_descriptor: Option<String>,
    omit_descriptor: bool,
}

impl ArchiveBuilder {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            version: version.to_string(),
            unit_lines: Vec::new(),
            tables: Vec::new(),
            symbols: Vec::new(),
            resources: Vec::new(),
            raw_descriptor: None,
            omit_descriptor: false,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn package(self, package: &str) -> Self {
        self.unit_line(format!("package = {package:?}"))
    }

    pub fn activator(self, class: &str) -> Self {
        self.unit_line(format!("activator = {class:?}"))
    }

    pub fn update_url(self, url: &str) -> Self {
        self.unit_line(format!("update_url = {url:?}"))
    }

    pub fn require_host_version(self, version: &str) -> Self {
        self.unit_line(format!("require_host_version = {version:?}"))
    }

    pub fn require_schema_version(self, version: &str) -> Self {
        self.unit_line(format!("require_schema_version = {version:?}"))
    }

    pub fn requires(self, units: &[&str]) -> Self {
        let list: Vec<String> = units.iter().map(|u| format!("{u:?}")).collect();
        self.unit_line(format!("require_units = [{}]", list.join(", ")))
    }

    pub fn extension(mut self, point: &str, class: &str) -> Self {
        self.tables.push(format!("[[extension]]\npoint = {point:?}\nclass = {class:?}\n"));
        self
    }

    /// Declare a job; `interval` is in seconds.
    pub fn job(mut self, name: &str, class: &str, interval: u64, on_startup: bool) -> Self {
        self.tables.push(format!(
            "[[job]]\nname = {name:?}\nclass = {class:?}\n\
             repeat_interval = {interval}\nstart_on_startup = {on_startup}\n"
        ));
        self
    }

    pub fn privilege(mut self, name: &str) -> Self {
        self.tables.push(format!("[[privilege]]\nname = {name:?}\n"));
        self
    }

    pub fn config(mut self, key: &str, default: &str) -> Self {
        self.tables.push(format!("[[config]]\nkey = {key:?}\ndefault = {default:?}\n"));
        self
    }

    /// Add a code symbol entry (`a.b.Name` stored as `classes/a/b/Name.class`).
    pub fn symbol(mut self, name: &str) -> Self {
        self.symbols.push(name.to_string());
        self
    }

    pub fn resource(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.resources.push((path.to_string(), content.into()));
        self
    }

    /// Replace the generated descriptor with literal text.
    pub fn raw_descriptor(mut self, text: &str) -> Self {
        self.raw_descriptor = Some(text.to_string());
        self
    }

    pub fn without_descriptor(mut self) -> Self {
        self.omit_descriptor = true;
        self
    }

    fn unit_line(mut self, line: String) -> Self {
        self.unit_lines.push(line);
        self
    }

    /// Descriptor text as it will be written to `unit.toml`.
    pub fn descriptor_text(&self) -> String {
        if let Some(raw) = &self.raw_descriptor {
            return raw.clone();
        }
        let mut text = format!(
            "[unit]\nid = {:?}\nname = {:?}\nversion = {:?}\n",
            self.id, self.name, self.version
        );
        for line in &self.unit_lines {
            text.push_str(line);
            text.push('\n');
        }
        for table in &self.tables {
            text.push('\n');
            text.push_str(table);
        }
        text
    }

    /// Gzip-compressed tar bytes.
    #[allow(clippy::expect_used)]
    pub fn bytes(&self) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut tar = tar::Builder::new(encoder);

        if !self.omit_descriptor {
            append(&mut tar, Path::new(DESCRIPTOR_ENTRY), self.descriptor_text().as_bytes());
        }
        for symbol in &self.symbols {
            append(&mut tar, &symbol_entry(symbol), &[0xCA, 0xFE, 0xBA, 0xBE]);
        }
        for (path, content) in &self.resources {
            append(&mut tar, Path::new(path), content);
        }

        tar.into_inner().and_then(|gz| gz.finish()).expect("in-memory archive finishes")
    }

    /// File name the repository expects: `<id>.unit`.
    pub fn file_name(&self) -> String {
        format!("{}.{UNIT_EXTENSION}", self.id)
    }

    /// Write the archive into `dir` and return its path.
    #[allow(clippy::expect_used)]
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.bytes()).expect("test archive is writable");
        path
    }
}

#[allow(clippy::expect_used)]
fn append<W: std::io::Write>(tar: &mut tar::Builder<W>, path: &Path, content: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    tar.append_data(&mut header, path, content).expect("entry appends to in-memory archive");
}

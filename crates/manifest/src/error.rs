// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from descriptor parsing and archive reading

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("archive {0} has no unit.toml descriptor")]
    MissingDescriptor(PathBuf),
    #[error("archive {path} is malformed: {message}")]
    MalformedArchive { path: PathBuf, message: String },
    #[error("invalid descriptor: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid descriptor: {0}")]
    Invalid(String),
    #[error("invalid update document: {0}")]
    UpdateDocument(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

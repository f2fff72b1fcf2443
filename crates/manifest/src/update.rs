// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote update document: `{ "unit_id", "current_version", "download_url" }`

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};

/// Required final path segment of every update URL.
pub const UPDATE_FILE_NAME: &str = "update.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub unit_id: String,
    pub current_version: String,
    pub download_url: String,
}

/// Parse an update document body. Blank fields are rejected.
pub fn parse_update_document(body: &str) -> Result<UpdateDocument, ManifestError> {
    let doc: UpdateDocument = serde_json::from_str(body)?;
    if doc.unit_id.trim().is_empty() || doc.current_version.trim().is_empty() {
        return Err(ManifestError::Invalid("update document lacks unit_id or current_version".into()));
    }
    Ok(doc)
}

/// Whether `url` names an update document (query string and fragment ignored).
pub fn is_update_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').next() == Some(UPDATE_FILE_NAME)
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;

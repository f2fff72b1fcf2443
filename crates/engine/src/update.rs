// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote update checks for units that advertise an update URL.

use mh_core::compare_version;
use mh_manifest::{
    is_update_url, parse_update_document, ManifestError, UnitDescriptor, UpdateInfo, UPDATE_FILE_NAME,
};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use std::cmp::Ordering;
use std::time::Duration;
use thiserror::Error;

/// Default request timeout; checks run off the startup path.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error(transparent)]
    Document(#[from] ManifestError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No update URL, or one that does not name an update document
    Skipped,
    /// Remote version is not newer; any recorded update is stale
    UpToDate,
    Available(UpdateInfo),
    /// Newer version advertised for a different unit id; ignored
    Mismatch,
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    client: reqwest::Client,
}

impl UpdateChecker {
    pub fn new(timeout: Duration) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn check_unit(&self, unit: &UnitDescriptor) -> Result<UpdateOutcome, UpdateError> {
        let Some(url) = unit.update_url.as_deref() else {
            return Ok(UpdateOutcome::Skipped);
        };
        if !is_update_url(url) {
            tracing::warn!(unit_id = %unit.id, url, "update URL does not end with {UPDATE_FILE_NAME}, skipping");
            return Ok(UpdateOutcome::Skipped);
        }

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "max-age=0,no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(UpdateError::Status { url: url.to_string(), status: response.status().as_u16() });
        }
        let doc = parse_update_document(&response.text().await?)?;

        if compare_version(Some(&doc.current_version), Some(&unit.version)) != Ordering::Greater {
            return Ok(UpdateOutcome::UpToDate);
        }
        if doc.unit_id != unit.id.as_str() {
            tracing::warn!(
                unit_id = %unit.id,
                remote_id = %doc.unit_id,
                "update document names a different unit, ignoring"
            );
            return Ok(UpdateOutcome::Mismatch);
        }
        tracing::info!(
            unit_id = %unit.id,
            current = %unit.version,
            available = %doc.current_version,
            "update available"
        );
        Ok(UpdateOutcome::Available(UpdateInfo { version: doc.current_version, download_url: doc.download_url }))
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;

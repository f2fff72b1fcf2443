// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mh-manifest: Unit descriptors, unit archives, and repository discovery

mod archive;
mod descriptor;
mod error;
mod find;
mod update;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use archive::{read_archive, UnitArchive, DESCRIPTOR_ENTRY, SYMBOL_DIR, UNIT_EXTENSION};
pub use descriptor::{
    parse_descriptor, ConfigDecl, ExtensionDecl, JobDecl, PrivilegeDecl, UnitDescriptor,
    UpdateInfo,
};
pub use error::ManifestError;
pub use find::{
    collect_unit_files, discover, discover_paths, ensure_repository, install_archive,
    remove_archive, DiscoveryReport, FindError, SkippedArchive,
};
pub use update::{is_update_url, parse_update_document, UpdateDocument, UPDATE_FILE_NAME};

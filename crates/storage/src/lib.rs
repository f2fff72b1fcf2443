// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mh-storage: Persisted job definitions and the stores that hold them

mod file;
mod job;
mod store;

pub use file::{FileJobStore, CURRENT_STORE_VERSION};
pub use job::JobDefinition;
pub use store::{JobStore, MemoryJobStore, StoreError};

#[cfg(any(test, feature = "test-support"))]
pub use job::JobDefinitionBuilder;

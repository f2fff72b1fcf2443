// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module host daemon library
//!
//! Configuration, logging, and the `Host` facade that embedders drive.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod host;
pub mod lifecycle;
pub mod logging;

pub use host::Host;
pub use lifecycle::{startup, Config, DaemonState, LifecycleError};

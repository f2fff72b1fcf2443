// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mh-core: Core types shared by the module host crates

pub mod macros;

pub mod actor;
pub mod clock;
pub mod id;
pub mod version;

pub use actor::{ActorSource, FixedActor};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{JobId, UnitId};
pub use version::{compare_version, is_version_satisfied};

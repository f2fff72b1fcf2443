// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background job scheduling: timer queue, fire-time rules, and the
//! scheduler service with its timer loop.

mod queue;
mod service;
pub mod trigger;

pub use queue::{TimerEntry, TimerQueue};
pub use service::{Scheduler, SchedulerConfig, SchedulerError, SchedulerSnapshot, TaskStatus, DEFAULT_DELAY};

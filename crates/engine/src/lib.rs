// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mh-engine: Execution contexts, extension registry, unit lifecycle,
//! and the background job scheduler

pub mod catalog;
pub mod context;
mod diagnostic;
pub mod extension;
pub mod factory;
pub mod lifecycle;
pub mod provision;
pub mod scheduler;
pub mod update;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use catalog::{Activator, CodeCatalog, Constructor, Extension, HookError, Instance, Task};
pub use context::{ContextRegistry, ExecutionContext, HostCodebase, Origin, ResolveError, Resolved};
pub use diagnostic::startup_diagnostic;
pub use extension::{ExtensionRegistry, RegisteredExtension};
pub use factory::{ContextTaskFactory, TaskFactory, TaskInstance};
pub use lifecycle::{
    resolve_order, HostVersions, LoadReport, Resolution, StartupReport, UnitError, UnitInfo, UnitManager, UnitState,
};
pub use provision::{MemoryProvisioner, Provisioner};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerError, SchedulerSnapshot, TaskStatus, DEFAULT_DELAY};
pub use update::{UpdateChecker, UpdateError, UpdateOutcome, DEFAULT_UPDATE_TIMEOUT};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated-actor accessor used for audit stamping.

/// Supplies the name of the actor on whose behalf the host is acting.
pub trait ActorSource: Send + Sync {
    fn current_actor(&self) -> Option<String>;
}

/// Actor source that always reports the same name.
#[derive(Debug, Clone)]
pub struct FixedActor(pub String);

impl FixedActor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl ActorSource for FixedActor {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-backed job store.
//!
//! The whole table is rewritten on every mutation (tmp file + rename). A file
//! that fails to parse on open is moved aside to a rotating `.bak` path and
//! the store starts empty.

use crate::job::JobDefinition;
use crate::store::{JobStore, JobTable, StoreError};
use chrono::{DateTime, Utc};
use mh_core::JobId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current on-disk schema version
pub const CURRENT_STORE_VERSION: u32 = 1;

const MAX_BAK_FILES: u32 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct StoredJobs {
    #[serde(rename = "v")]
    version: u32,
    next_id: u64,
    tasks: Vec<JobDefinition>,
    saved_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FileJobStore {
    path: PathBuf,
    table: Mutex<JobTable>,
}

impl FileJobStore {
    /// Open the store at `path`, creating parent directories as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let table = if path.exists() { load(&path)? } else { JobTable::default() };
        Ok(Self { path, table: Mutex::new(table) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut JobTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = self.table.lock();
        let mut next = table.clone();
        let out = f(&mut next)?;
        save(&self.path, &next)?;
        *table = next;
        Ok(out)
    }
}

impl JobStore for FileJobStore {
    fn tasks(&self) -> Result<Vec<JobDefinition>, StoreError> {
        Ok(self.table.lock().tasks.values().cloned().collect())
    }

    fn task(&self, id: JobId) -> Result<Option<JobDefinition>, StoreError> {
        Ok(self.table.lock().tasks.get(&id).cloned())
    }

    fn task_by_name(&self, name: &str) -> Result<Option<JobDefinition>, StoreError> {
        Ok(self.table.lock().by_name(name).cloned())
    }

    fn create(&self, def: &mut JobDefinition) -> Result<JobId, StoreError> {
        let mut staged = def.clone();
        let id = self.mutate(|t| t.create(&mut staged))?;
        *def = staged;
        Ok(id)
    }

    fn update(&self, def: &JobDefinition) -> Result<(), StoreError> {
        self.mutate(|t| t.update(def))
    }

    fn delete(&self, id: JobId) -> Result<(), StoreError> {
        self.mutate(|t| t.delete(id))
    }
}

fn load(path: &Path) -> Result<JobTable, StoreError> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<StoredJobs>(&content) {
        Ok(stored) => {
            let tasks = stored.tasks.into_iter().filter_map(|t| t.id.map(|id| (id, t))).collect();
            Ok(JobTable { next_id: stored.next_id, tasks })
        }
        Err(e) => {
            let bak = rotate_bak_path(path);
            tracing::warn!(
                path = %path.display(),
                backup = %bak.display(),
                error = %e,
                "job store is corrupt, moving aside and starting empty"
            );
            fs::rename(path, &bak)?;
            Ok(JobTable::default())
        }
    }
}

fn save(path: &Path, table: &JobTable) -> Result<(), StoreError> {
    let stored = StoredJobs {
        version: CURRENT_STORE_VERSION,
        next_id: table.next_id,
        tasks: table.tasks.values().cloned().collect(),
        saved_at: Utc::now(),
    };
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&stored)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;

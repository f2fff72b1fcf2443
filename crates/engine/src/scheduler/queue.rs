// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Min-heap of pending firings.
//!
//! Cancelled or re-armed timers are deleted lazily: an entry is live only
//! while `armed` still maps its job to the same generation and fire time.

use mh_core::JobId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerEntry {
    pub fire_at_ms: u64,
    seq: u64,
    pub job: JobId,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    armed: HashMap<JobId, (u64, u64)>,
    seq: u64,
}

impl TimerQueue {
    /// Arm (or re-arm) the timer for `job`. Any earlier timer for the job is dropped.
    pub fn set_timer(&mut self, job: JobId, generation: u64, fire_at_ms: u64) {
        self.seq += 1;
        self.armed.insert(job, (generation, fire_at_ms));
        self.heap.push(Reverse(TimerEntry { fire_at_ms, seq: self.seq, job, generation }));
    }

    pub fn cancel_timer(&mut self, job: JobId) -> bool {
        self.armed.remove(&job).is_some()
    }

    /// Pop the earliest live entry due at or before `now_ms`, disarming it.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerEntry> {
        self.prune();
        let Reverse(top) = self.heap.peek()?;
        if top.fire_at_ms > now_ms {
            return None;
        }
        let Reverse(entry) = self.heap.pop()?;
        self.armed.remove(&entry.job);
        Some(entry)
    }

    pub fn next_deadline(&mut self) -> Option<u64> {
        self.prune();
        self.heap.peek().map(|Reverse(e)| e.fire_at_ms)
    }

    pub fn scheduled_at(&self, job: JobId) -> Option<u64> {
        self.armed.get(&job).map(|(_, at)| *at)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.armed.clear();
    }

    fn is_live(&self, entry: &TimerEntry) -> bool {
        self.armed.get(&entry.job) == Some(&(entry.generation, entry.fire_at_ms))
    }

    fn prune(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

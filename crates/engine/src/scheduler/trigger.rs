// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-time arithmetic. All values are epoch milliseconds.

use mh_storage::JobDefinition;

pub fn interval_ms(def: &JobDefinition) -> u64 {
    def.repeat_interval.saturating_mul(1000)
}

/// When a freshly bound job fires first.
///
/// - start time in the future: at the start time
/// - start time in the past, repeating: the next tick of the start-time
///   grid at or after now
/// - start time in the past, one-shot: now
/// - no start time, repeating: after `default_delay_ms`
/// - no start time, one-shot: now
pub fn first_fire_ms(def: &JobDefinition, now_ms: u64, default_delay_ms: u64) -> u64 {
    let interval = interval_ms(def);
    match def.start_time {
        Some(start) => {
            let start_ms = u64::try_from(start.timestamp_millis()).unwrap_or(0);
            next_execution_ms(start_ms, interval, now_ms)
        }
        None if interval > 0 => now_ms.saturating_add(default_delay_ms),
        None => now_ms,
    }
}

/// First instant `start_ms + k * interval_ms >= now_ms`, or `now_ms` when
/// the start has passed and there is no interval.
pub fn next_execution_ms(start_ms: u64, interval_ms: u64, now_ms: u64) -> u64 {
    if start_ms >= now_ms {
        return start_ms;
    }
    if interval_ms == 0 {
        return now_ms;
    }
    let behind = now_ms - start_ms;
    let ticks = behind.div_ceil(interval_ms);
    start_ms.saturating_add(ticks.saturating_mul(interval_ms))
}

/// Next firing after a run that was due at `scheduled_ms`. Missed ticks
/// are skipped: the result is the first grid point strictly after `now_ms`.
pub fn following_fire_ms(scheduled_ms: u64, interval_ms: u64, now_ms: u64) -> u64 {
    let next = scheduled_ms.saturating_add(interval_ms);
    if next > now_ms || interval_ms == 0 {
        return next;
    }
    let missed = (now_ms - scheduled_ms) / interval_ms;
    scheduled_ms.saturating_add((missed + 1).saturating_mul(interval_ms))
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;

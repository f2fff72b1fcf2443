// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dot-separated numeric version comparison.
//!
//! Versions look like `w.x.y.z` with any number of segments. Missing trailing
//! segments compare as zero, so `1.2` and `1.2.0` are equal.

use std::cmp::Ordering;

/// Compare two versions segment by segment.
///
/// Returns `Equal` when either side is absent, and also when a segment is not
/// numeric (the failure is logged).
pub fn compare_version(version: Option<&str>, other: Option<&str>) -> Ordering {
    let (Some(version), Some(other)) = (version, other) else {
        return Ordering::Equal;
    };
    match (segments(version), segments(other)) {
        (Ok(left), Ok(right)) => {
            let len = left.len().max(right.len());
            (0..len)
                .map(|i| {
                    let l = left.get(i).copied().unwrap_or(0);
                    let r = right.get(i).copied().unwrap_or(0);
                    l.cmp(&r)
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(version, other, error = %e, "non-numeric version segment");
            Ordering::Equal
        }
    }
}

/// True when `actual` is at least `required`, or nothing is required.
pub fn is_version_satisfied(required: Option<&str>, actual: &str) -> bool {
    compare_version(Some(actual), required) != Ordering::Less
}

fn segments(version: &str) -> Result<Vec<u64>, std::num::ParseIntError> {
    version
        .split('.')
        .map(str::trim)
        .map(|s| if s.is_empty() { Ok(0) } else { s.parse::<u64>() })
        .collect()
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;

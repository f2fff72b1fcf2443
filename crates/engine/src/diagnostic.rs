// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup error text stored on a unit that failed to start.

use std::error::Error;

/// Prefix for lines that mention the unit's own package.
const OWN_CODE_MARK: &str = " ** ";

/// Optional context message, then the error and each cause on its own
/// line. Lines naming `package` are marked with ` ** `.
pub fn startup_diagnostic(package: &str, message: Option<&str>, error: &(dyn Error + 'static)) -> String {
    let mut lines = Vec::new();
    if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
        lines.push(message.to_string());
    }
    lines.push(mark(package, error.to_string()));
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(mark(package, format!("caused by: {cause}")));
        source = cause.source();
    }
    lines.join("\n")
}

fn mark(package: &str, line: String) -> String {
    if !package.is_empty() && line.contains(package) {
        format!("{OWN_CODE_MARK}{line}")
    } else {
        line
    }
}

#[cfg(test)]
#[path = "diagnostic_tests.rs"]
mod tests;

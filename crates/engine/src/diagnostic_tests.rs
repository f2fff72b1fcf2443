// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::ResolveError;

#[test]
fn lists_message_error_and_causes() {
    let err = ResolveError::Instantiation {
        name: "org.example.report.Activator".into(),
        source: "database unavailable".into(),
    };
    let text = startup_diagnostic("org.example.report", Some("Unable to start unit"), &err);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Unable to start unit",
            " ** failed to instantiate 'org.example.report.Activator': database unavailable",
            "caused by: database unavailable",
        ]
    );
}

#[test]
fn blank_message_is_omitted() {
    let err = ResolveError::NotFound("host.Missing".into());
    let text = startup_diagnostic("org.example", Some("  "), &err);
    assert_eq!(text, "symbol 'host.Missing' is not visible from this context");
}

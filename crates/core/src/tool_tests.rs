// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_round_trips_display() {
    for tool in Tool::ALL {
        let parsed: Tool = tool.to_string().parse().unwrap();
        assert_eq!(parsed, tool);
    }
}

#[test]
fn parse_rejects_unknown() {
    let err = "emacs".parse::<Tool>().unwrap_err();
    assert_eq!(err.0, "emacs");
}

#[test]
fn resume_key_namespaces() {
    assert_eq!(Tool::Claude.resume_key_field(), "session_id");
    assert_eq!(Tool::Cursor.resume_key_field(), "session_id");
    assert_eq!(Tool::Codex.resume_key_field(), "thread_id");
}

#[test]
fn serde_uses_snake_case_names() {
    assert_eq!(serde_json::to_string(&Tool::Claude).unwrap(), "\"claude\"");
    let t: Tool = serde_json::from_str("\"codex\"").unwrap();
    assert_eq!(t, Tool::Codex);
}

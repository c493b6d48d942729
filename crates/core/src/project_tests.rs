// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn accepts_valid_names() {
    for name in ["a", "acme", "my-project_2", &"x".repeat(40)] {
        assert!(validate_project_name(name).is_ok(), "rejected {name:?}");
    }
}

#[test]
fn rejects_invalid_names() {
    for name in ["", "UPPER", "has space", "dot.name", &"x".repeat(41), "émoji"] {
        let err = validate_project_name(name).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidProjectName, "accepted {name:?}");
    }
}

#[test]
fn args_for_missing_tool_is_empty() {
    let project = ProjectConfig {
        name: "acme".into(),
        path: "/tmp/acme".into(),
        enabled_tools: vec![Tool::Claude],
        default_tool: Tool::Claude,
        default_args: HashMap::from([(Tool::Claude, vec!["--model".into(), "opus".into()])]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(project.args_for(Tool::Claude), ["--model", "opus"]);
    assert!(project.args_for(Tool::Codex).is_empty());
    assert!(project.is_enabled(Tool::Claude));
    assert!(!project.is_enabled(Tool::Cursor));
}

#[test]
fn default_args_round_trip_with_tool_keys() {
    let mut args = HashMap::new();
    args.insert(Tool::Codex, vec!["--profile".to_string(), "fast".to_string()]);
    let project = ProjectConfig {
        name: "acme".into(),
        path: "/tmp/acme".into(),
        enabled_tools: vec![Tool::Codex],
        default_tool: Tool::Codex,
        default_args: args,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let json = serde_json::to_string(&project).unwrap();
    let back: ProjectConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, project);
}

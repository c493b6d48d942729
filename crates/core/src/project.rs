// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration: where a session's tools run.

use crate::error::{EngineError, ErrorCode};
use crate::tool::Tool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Longest accepted project name.
pub const MAX_PROJECT_NAME_LEN: usize = 40;

/// Long-lived project configuration, persisted in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Absolute path; must exist when the project is created.
    pub path: PathBuf,
    pub enabled_tools: Vec<Tool>,
    pub default_tool: Tool,
    /// Extra argv entries per tool, passed verbatim on every invocation.
    #[serde(default)]
    pub default_args: HashMap<Tool, Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectConfig {
    pub fn is_enabled(&self, tool: Tool) -> bool {
        self.enabled_tools.contains(&tool)
    }

    pub fn args_for(&self, tool: Tool) -> &[String] {
        self.default_args.get(&tool).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Validate a project name against `[a-z0-9_-]{1,40}`.
pub fn validate_project_name(name: &str) -> Result<(), EngineError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_PROJECT_NAME_LEN
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(EngineError::new(
            ErrorCode::InvalidProjectName,
            format!("project name must match [a-z0-9_-]{{1,40}}: {:?}", name),
        ))
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;

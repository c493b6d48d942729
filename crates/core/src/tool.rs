// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The set of coding CLIs the orchestrator can drive.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A coding assistant CLI.
///
/// Each tool keeps its conversation-continuation key in its own namespace
/// within a session's `adapter_state` map; switching tools mid-session must
/// not clobber another tool's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Claude,
    Codex,
    Cursor,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Claude, Tool::Codex, Tool::Cursor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Claude => "claude",
            Tool::Codex => "codex",
            Tool::Cursor => "cursor",
        }
    }

    /// Key under which this tool's resume token lives in `adapter_state`.
    pub fn resume_key_field(&self) -> &'static str {
        match self {
            Tool::Claude | Tool::Cursor => "session_id",
            Tool::Codex => "thread_id",
        }
    }
}

crate::simple_display! {
    Tool {
        Claude => "claude",
        Codex => "codex",
        Cursor => "cursor",
    }
}

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Tool::Claude),
            "codex" => Ok(Tool::Codex),
            "cursor" => Ok(Tool::Cursor),
            other => Err(UnknownTool(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized tool name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record: a chat thread bound to a project and a tool.

use crate::id::JobId;
use crate::tool::Tool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Conversational context bound 1:1 to a chat thread.
///
/// Invariants: at most one running job; every id in `queue` names a queued
/// job in the job map. Sessions are created once and never destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub thread_id: String,
    pub project_name: String,
    /// Tool new enqueues will freeze. Already-queued jobs keep theirs.
    pub tool: Tool,
    /// Per-tool resume keys (`session_id` for claude/cursor, `thread_id`
    /// for codex). Merged, never replaced wholesale.
    #[serde(default)]
    pub adapter_state: HashMap<String, String>,
    /// Pending job ids in enqueue order.
    #[serde(default)]
    pub queue: VecDeque<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_job_id: Option<JobId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        thread_id: impl Into<String>,
        project_name: impl Into<String>,
        tool: Tool,
        adapter_state: HashMap<String, String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            project_name: project_name.into(),
            tool,
            adapter_state,
            queue: VecDeque::new(),
            running_job_id: None,
            last_job_id: None,
            created_at,
            updated_at: created_at,
            last_activity_at: created_at,
        }
    }

    /// Resume key for the given tool, treating empty values as absent.
    pub fn resume_key(&self, tool: Tool) -> Option<&str> {
        self.adapter_state
            .get(tool.resume_key_field())
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable event types.
//!
//! The event log is the single source of truth; in-memory state is a
//! projection rebuilt by replaying these events. Serialized with
//! `{"type": "job:enqueued", "payload": {...}}` adjacent tagging, wrapped
//! in an [`Envelope`] carrying `seq` and `ts`.

mod methods;

use crate::error::ErrorCode;
use crate::id::JobId;
use crate::tool::Tool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Events that drive all durable state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Audit record; project config itself lives in `config.json`.
    #[serde(rename = "project:created")]
    ProjectCreated { project_name: String, path: PathBuf, enabled_tools: Vec<Tool> },

    #[serde(rename = "session:created")]
    SessionCreated {
        thread_id: String,
        project_name: String,
        tool: Tool,
        #[serde(default)]
        adapter_state: HashMap<String, String>,
    },

    /// Running and already-queued jobs keep their frozen tool.
    #[serde(rename = "session:tool_changed")]
    ToolChanged { thread_id: String, tool: Tool },

    #[serde(rename = "job:enqueued")]
    JobEnqueued {
        thread_id: String,
        job_id: JobId,
        discord_message_id: String,
        prompt: String,
        tool: Tool,
        attempt: u32,
    },

    #[serde(rename = "job:started")]
    JobStarted { thread_id: String, job_id: JobId },

    #[serde(rename = "job:completed")]
    JobCompleted {
        thread_id: String,
        job_id: JobId,
        result_excerpt: String,
        #[serde(default)]
        adapter_state: HashMap<String, String>,
    },

    #[serde(rename = "job:failed")]
    JobFailed {
        thread_id: String,
        job_id: JobId,
        error_code: ErrorCode,
        error_message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        adapter_state: Option<HashMap<String, String>>,
    },

    /// Synthetic recovery event: the job was running when the process died.
    #[serde(rename = "job:unknown_after_crash")]
    JobMarkedUnknownAfterCrash { thread_id: String, job_id: JobId },
}

/// Wire envelope: one JSON object per line in `events.ndjson`.
///
/// `seq` starts at 1 and increases by exactly 1 with no gaps; startup
/// refuses to run on a log that violates this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

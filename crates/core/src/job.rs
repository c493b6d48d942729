// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and state machine.

use crate::error::ErrorCode;
use crate::id::JobId;
use crate::tool::Tool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a job is in its one-way lifecycle.
///
/// ```text
///  enqueue          start           finish
///   · ────────▶ queued ────────▶ running ────────▶ success
///                                      ╰─────────▶ failed
///                                      ╰─────────▶ unknown_after_crash
/// ```
///
/// The crash edge is taken only by startup recovery; a job that was running
/// when the process died is never guessed into `success` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Success,
    Failed,
    UnknownAfterCrash,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failed | JobState::UnknownAfterCrash)
    }

    /// Terminal states the operator may `/retry` from.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobState::Failed | JobState::UnknownAfterCrash)
    }
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Running => "running",
        Success => "success",
        Failed => "failed",
        UnknownAfterCrash => "unknown_after_crash",
    }
}

/// One enqueued prompt plus its execution outcome.
///
/// Fields other than `state`, the finish timestamps, and the outcome fields
/// are frozen at enqueue time. A retry is a fresh job, never a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    /// Owning session (chat thread).
    pub thread_id: String,
    /// Source message that enqueued this job. Retries use a synthetic
    /// `retry:<old_job>:<new_job>` key to stay unique in the dedup index.
    pub discord_message_id: String,
    pub state: JobState,
    pub prompt: String,
    /// Tool frozen at enqueue; a later `/tool` switch does not affect it.
    pub tool: Tool,
    /// Starts at 1; each retry of a lineage increments.
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// First characters of the assistant's final text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_excerpt: Option<String>,
}

impl Job {
    /// Create a freshly enqueued job.
    pub fn enqueued(
        job_id: JobId,
        thread_id: impl Into<String>,
        discord_message_id: impl Into<String>,
        prompt: impl Into<String>,
        tool: Tool,
        attempt: u32,
    ) -> Self {
        Self {
            job_id,
            thread_id: thread_id.into(),
            discord_message_id: discord_message_id.into(),
            state: JobState::Queued,
            prompt: prompt.into(),
            tool,
            attempt,
            error_code: None,
            error_message: None,
            started_at: None,
            finished_at: None,
            result_excerpt: None,
        }
    }
}

/// Truncate assistant text to the stored excerpt length, on a char boundary.
pub fn result_excerpt(text: &str) -> String {
    text.chars().take(crate::limits::MAX_RESULT_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

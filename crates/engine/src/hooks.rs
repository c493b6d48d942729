// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback seam toward the chat surface.
//!
//! Hooks run synchronously on the engine's tasks and are best-effort: a
//! failing hook is logged and swallowed, never allowed to fail a job.

use tether_adapters::ProgressEvent;
use tether_core::{ErrorCode, JobId, JobState, Tool};

/// Result of a hook invocation; the error is only ever logged.
pub type HookResult = Result<(), String>;

/// A job entered `running`.
#[derive(Debug, Clone)]
pub struct JobStartedInfo {
    pub thread_id: String,
    pub job_id: JobId,
    pub prompt: String,
    pub tool: Tool,
    pub attempt: u32,
}

/// A job reached a terminal state.
#[derive(Debug, Clone)]
pub struct JobFinishedInfo {
    pub thread_id: String,
    pub job_id: JobId,
    pub state: JobState,
    pub result_excerpt: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

/// Lifecycle and progress callbacks fired while jobs are processed.
pub trait EngineHooks: Send + Sync {
    fn on_job_started(&self, _info: &JobStartedInfo) -> HookResult {
        Ok(())
    }

    fn on_job_progress(
        &self,
        _thread_id: &str,
        _job_id: &JobId,
        _event: &ProgressEvent,
    ) -> HookResult {
        Ok(())
    }

    fn on_job_finished(&self, _info: &JobFinishedInfo) -> HookResult {
        Ok(())
    }
}

/// Default hooks: do nothing.
pub struct NoopHooks;

impl EngineHooks for NoopHooks {}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event methods: name, log summary, owning ids

use super::Event;
use crate::id::JobId;

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProjectCreated { .. } => "project:created",
            Event::SessionCreated { .. } => "session:created",
            Event::ToolChanged { .. } => "session:tool_changed",
            Event::JobEnqueued { .. } => "job:enqueued",
            Event::JobStarted { .. } => "job:started",
            Event::JobCompleted { .. } => "job:completed",
            Event::JobFailed { .. } => "job:failed",
            Event::JobMarkedUnknownAfterCrash { .. } => "job:unknown_after_crash",
        }
    }

    /// One-line summary for tracing.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::ProjectCreated { project_name, .. } => {
                format!("{t} project={project_name}")
            }
            Event::SessionCreated { thread_id, project_name, tool, .. } => {
                format!("{t} thread={thread_id} project={project_name} tool={tool}")
            }
            Event::ToolChanged { thread_id, tool } => {
                format!("{t} thread={thread_id} tool={tool}")
            }
            Event::JobEnqueued { thread_id, job_id, tool, attempt, .. } => {
                format!("{t} thread={thread_id} job={job_id} tool={tool} attempt={attempt}")
            }
            Event::JobStarted { thread_id, job_id }
            | Event::JobMarkedUnknownAfterCrash { thread_id, job_id } => {
                format!("{t} thread={thread_id} job={job_id}")
            }
            Event::JobCompleted { thread_id, job_id, .. } => {
                format!("{t} thread={thread_id} job={job_id}")
            }
            Event::JobFailed { thread_id, job_id, error_code, .. } => {
                format!("{t} thread={thread_id} job={job_id} code={error_code}")
            }
        }
    }

    /// Owning thread, if the event belongs to a session.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Event::ProjectCreated { .. } => None,
            Event::SessionCreated { thread_id, .. }
            | Event::ToolChanged { thread_id, .. }
            | Event::JobEnqueued { thread_id, .. }
            | Event::JobStarted { thread_id, .. }
            | Event::JobCompleted { thread_id, .. }
            | Event::JobFailed { thread_id, .. }
            | Event::JobMarkedUnknownAfterCrash { thread_id, .. } => Some(thread_id),
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobEnqueued { job_id, .. }
            | Event::JobStarted { job_id, .. }
            | Event::JobCompleted { job_id, .. }
            | Event::JobFailed { job_id, .. }
            | Event::JobMarkedUnknownAfterCrash { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

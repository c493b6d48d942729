// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator operations backing the chat commands.
//!
//! Argument validation lives here so every surface (slash commands, tests)
//! gets the same stable error codes.

use crate::coordinator::{Engine, OpError};
use std::collections::HashMap;
use std::path::PathBuf;
use tether_core::{
    validate_project_name, Clock, EngineError, ErrorCode, Event, Job, JobId, JobState,
    ProjectConfig, Session, Tool, MAX_QUEUE_PER_SESSION,
};
use tether_storage::state::dedupe_key;

/// Parameters for `project create`.
pub struct NewProject {
    pub name: String,
    pub path: PathBuf,
    pub enabled_tools: Vec<Tool>,
    /// Defaults to the first enabled tool.
    pub default_tool: Option<Tool>,
    pub default_args: HashMap<Tool, Vec<String>>,
}

/// Outcome of an enqueue: the job that owns the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub job_id: JobId,
    /// True when the message id was already enqueued; `job_id` is the
    /// original job and no new work was created.
    pub deduped: bool,
}

/// Compact job view for `/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: JobId,
    pub state: JobState,
    pub tool: Tool,
    pub attempt: u32,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub result_excerpt: Option<String>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            state: job.state,
            tool: job.tool,
            attempt: job.attempt,
            error_code: job.error_code,
            error_message: job.error_message.clone(),
            result_excerpt: job.result_excerpt.clone(),
        }
    }
}

/// Project view for `project status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStatus {
    pub project: ProjectConfig,
    pub sessions: usize,
    pub queued_jobs: usize,
    pub running_jobs: usize,
}

/// Session view for `/status` and `session list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub thread_id: String,
    pub project_name: String,
    pub tool: Tool,
    pub queued: usize,
    pub running_job_id: Option<JobId>,
    pub last_job: Option<JobSummary>,
    /// The last job can be retried with `/retry`.
    pub retry_hint: bool,
}

impl<C: Clock> Engine<C> {
    /// Single-owner gate for every operator command.
    pub fn ensure_owner(&self, caller_id: &str) -> Result<(), EngineError> {
        if self.inner.config.lock().owner_id() == caller_id {
            Ok(())
        } else {
            Err(EngineError::new(ErrorCode::OwnerOnly, "only the owner may use this bot"))
        }
    }

    /// Validate and persist a new project.
    pub fn create_project(&self, new: NewProject) -> Result<ProjectConfig, OpError> {
        validate_project_name(&new.name)?;
        if self.inner.config.lock().project(&new.name).is_some() {
            return Err(EngineError::new(
                ErrorCode::ProjectExists,
                format!("project already exists: {}", new.name),
            )
            .into());
        }
        if !new.path.is_absolute() || !new.path.is_dir() {
            return Err(EngineError::new(
                ErrorCode::InvalidPath,
                format!("path must be an existing absolute directory: {}", new.path.display()),
            )
            .into());
        }

        let mut enabled_tools = Vec::new();
        for tool in new.enabled_tools {
            if !enabled_tools.contains(&tool) {
                enabled_tools.push(tool);
            }
        }
        if enabled_tools.is_empty() {
            return Err(EngineError::new(
                ErrorCode::InvalidToolset,
                "at least one tool must be enabled",
            )
            .into());
        }
        let default_tool = new.default_tool.unwrap_or(enabled_tools[0]);
        if !enabled_tools.contains(&default_tool) {
            return Err(EngineError::new(
                ErrorCode::InvalidToolset,
                format!("default tool {default_tool} is not in the enabled set"),
            )
            .into());
        }

        let now = self.inner.store.lock().clock().now_utc();
        let project = ProjectConfig {
            name: new.name.clone(),
            path: new.path.clone(),
            enabled_tools: enabled_tools.clone(),
            default_tool,
            default_args: new.default_args,
            created_at: now,
            updated_at: now,
        };
        self.inner.config.lock().insert_project(project.clone())?;
        self.inner.store.lock().append(Event::ProjectCreated {
            project_name: new.name,
            path: new.path,
            enabled_tools,
        })?;
        tracing::info!(project = %project.name, "project created");
        Ok(project)
    }

    pub fn project_status(&self, name: &str) -> Result<ProjectStatus, OpError> {
        let project = self
            .inner
            .config
            .lock()
            .project(name)
            .cloned()
            .ok_or_else(|| project_not_found(name))?;
        let store = self.inner.store.lock();
        let state = store.state();
        let sessions: Vec<&Session> =
            state.sessions.values().filter(|s| s.project_name == name).collect();
        Ok(ProjectStatus {
            queued_jobs: sessions.iter().map(|s| s.queue.len()).sum(),
            running_jobs: sessions.iter().filter(|s| s.running_job_id.is_some()).count(),
            sessions: sessions.len(),
            project,
        })
    }

    pub fn list_projects(&self) -> Vec<ProjectConfig> {
        let mut projects: Vec<_> = self.inner.config.lock().projects().values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        projects
    }

    /// Bind a chat thread to a project. Idempotent: an existing session is
    /// returned unchanged (sessions are never destroyed).
    pub fn start_session(
        &self,
        thread_id: &str,
        project_name: &str,
        tool: Option<Tool>,
    ) -> Result<Session, OpError> {
        if let Some(session) = self.find_session(thread_id) {
            return Ok(session);
        }

        let project = self
            .inner
            .config
            .lock()
            .project(project_name)
            .cloned()
            .ok_or_else(|| project_not_found(project_name))?;
        let tool = tool.unwrap_or(project.default_tool);
        if !project.is_enabled(tool) {
            return Err(tool_not_enabled(tool, project_name).into());
        }

        let mut store = self.inner.store.lock();
        if let Some(session) = store.state().sessions.get(thread_id) {
            return Ok(session.clone());
        }
        store.append(Event::SessionCreated {
            thread_id: thread_id.to_string(),
            project_name: project_name.to_string(),
            tool,
            adapter_state: HashMap::new(),
        })?;
        store
            .state()
            .sessions
            .get(thread_id)
            .cloned()
            .ok_or_else(|| session_not_found(thread_id).into())
    }

    /// Change the tool new enqueues will freeze. Queued and running jobs
    /// keep theirs.
    pub fn switch_tool(&self, thread_id: &str, tool: Tool) -> Result<(), OpError> {
        let project_name = self
            .find_session(thread_id)
            .map(|s| s.project_name)
            .ok_or_else(|| session_not_found(thread_id))?;
        let enabled = self
            .inner
            .config
            .lock()
            .project(&project_name)
            .map(|p| p.is_enabled(tool))
            .ok_or_else(|| project_not_found(&project_name))?;
        if !enabled {
            return Err(tool_not_enabled(tool, &project_name).into());
        }
        self.inner
            .store
            .lock()
            .append(Event::ToolChanged { thread_id: thread_id.to_string(), tool })?;
        Ok(())
    }

    /// Enqueue a prompt, exactly once per source message.
    pub fn enqueue(
        &self,
        thread_id: &str,
        message_id: &str,
        prompt: &str,
    ) -> Result<EnqueueReceipt, OpError> {
        let receipt = {
            let mut store = self.inner.store.lock();
            let state = store.state();
            let session =
                state.sessions.get(thread_id).ok_or_else(|| session_not_found(thread_id))?;

            if let Some(existing) = state.dedupe.get(&dedupe_key(thread_id, message_id)) {
                return Ok(EnqueueReceipt { job_id: existing.clone(), deduped: true });
            }
            if session.queue.len() >= MAX_QUEUE_PER_SESSION {
                return Err(EngineError::new(
                    ErrorCode::QueueFull,
                    format!("session already has {MAX_QUEUE_PER_SESSION} queued jobs"),
                )
                .into());
            }

            let job_id = JobId::generate();
            let tool = session.tool;
            store.append(Event::JobEnqueued {
                thread_id: thread_id.to_string(),
                job_id: job_id.clone(),
                discord_message_id: message_id.to_string(),
                prompt: prompt.to_string(),
                tool,
                attempt: 1,
            })?;
            EnqueueReceipt { job_id, deduped: false }
        };
        self.notify_new_work();
        Ok(receipt)
    }

    /// Re-enqueue the last finished job as a fresh attempt.
    pub fn retry(&self, thread_id: &str) -> Result<EnqueueReceipt, OpError> {
        let receipt = {
            let mut store = self.inner.store.lock();
            let state = store.state();
            let session =
                state.sessions.get(thread_id).ok_or_else(|| session_not_found(thread_id))?;

            let last_job = session
                .last_job_id
                .as_ref()
                .and_then(|id| state.jobs.get(id))
                .cloned()
                .ok_or_else(|| {
                    EngineError::new(ErrorCode::JobNotRetryable, "no finished job to retry")
                })?;
            if !last_job.state.is_retryable() {
                return Err(EngineError::new(
                    ErrorCode::JobNotRetryable,
                    format!("last job is {}, not retryable", last_job.state),
                )
                .into());
            }
            if session.queue.len() >= MAX_QUEUE_PER_SESSION {
                return Err(EngineError::new(
                    ErrorCode::QueueFull,
                    format!("session already has {MAX_QUEUE_PER_SESSION} queued jobs"),
                )
                .into());
            }

            let job_id = JobId::generate();
            let tool = session.tool;
            // Synthetic message id keeps the dedup index collision-free.
            let message_id = format!("retry:{}:{}", last_job.job_id, job_id);
            store.append(Event::JobEnqueued {
                thread_id: thread_id.to_string(),
                job_id: job_id.clone(),
                discord_message_id: message_id,
                prompt: last_job.prompt.clone(),
                tool,
                attempt: last_job.attempt + 1,
            })?;
            EnqueueReceipt { job_id, deduped: false }
        };
        self.notify_new_work();
        Ok(receipt)
    }

    pub fn session_status(&self, thread_id: &str) -> Result<SessionStatus, OpError> {
        let store = self.inner.store.lock();
        let state = store.state();
        let session = state.sessions.get(thread_id).ok_or_else(|| session_not_found(thread_id))?;
        Ok(status_of(session, state))
    }

    pub fn list_sessions(&self) -> Vec<SessionStatus> {
        let store = self.inner.store.lock();
        let state = store.state();
        let mut statuses: Vec<_> = state.sessions.values().map(|s| status_of(s, state)).collect();
        statuses.sort_by(|a, b| a.thread_id.cmp(&b.thread_id));
        statuses
    }

    fn find_session(&self, thread_id: &str) -> Option<Session> {
        self.inner.store.lock().state().sessions.get(thread_id).cloned()
    }
}

fn status_of(session: &Session, state: &tether_storage::RuntimeState) -> SessionStatus {
    let last_job = session.last_job_id.as_ref().and_then(|id| state.jobs.get(id));
    SessionStatus {
        thread_id: session.thread_id.clone(),
        project_name: session.project_name.clone(),
        tool: session.tool,
        queued: session.queue.len(),
        running_job_id: session.running_job_id.clone(),
        last_job: last_job.map(JobSummary::from),
        retry_hint: last_job.map(|j| j.state.is_retryable()).unwrap_or(false),
    }
}

fn session_not_found(thread_id: &str) -> EngineError {
    EngineError::new(ErrorCode::SessionNotFound, format!("no session for thread {thread_id}"))
}

fn project_not_found(name: &str) -> EngineError {
    EngineError::new(ErrorCode::ProjectNotFound, format!("project not found: {name}"))
}

fn tool_not_enabled(tool: Tool, project: &str) -> EngineError {
    EngineError::new(
        ErrorCode::ToolNotEnabled,
        format!("tool {tool} is not enabled for project {project}"),
    )
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

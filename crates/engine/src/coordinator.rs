// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: run loop, job processing, crash recovery wiring.
//!
//! One edge-triggered kick loop owns every scheduling decision. Admission
//! appends `job:started` while holding the store lock, so the pick policy
//! can never hand the same job out twice; the rest of the job runs as a
//! background task whose completion re-kicks the loop. Nothing thrown by a
//! job task escapes past it.

use crate::hooks::{EngineHooks, JobFinishedInfo, JobStartedInfo, NoopHooks};
use crate::job_log;
use crate::scheduler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_adapters::{ProgressEvent, RunRequest, ToolAdapter};
use tether_core::job::result_excerpt;
use tether_core::{
    Clock, EngineError, ErrorCode, Event, JobId, JobState, SystemClock, Tool, CLI_TIMEOUT_SEC,
};
use tether_storage::{ConfigError, ConfigStore, EventStore, RuntimeState, StoreError};
use thiserror::Error;

/// How often `wait_for_idle` re-checks the projection.
const IDLE_POLL_MS: u64 = 10;

/// Errors surfaced by engine operations.
///
/// `Domain` failures carry a stable code for the operator; the other
/// variants are infrastructure failures the process should treat as fatal.
#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Domain(#[from] EngineError),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Engine construction parameters.
pub struct EngineConfig {
    /// Directory holding `events.ndjson`, `snapshot.json`, `config.json`,
    /// and `logs/`.
    pub state_dir: PathBuf,
    /// Chat user allowed to drive this engine.
    pub owner_id: String,
}

/// The orchestrator core. Cheap to clone; clones share one engine.
pub struct Engine<C: Clock = SystemClock> {
    pub(crate) inner: Arc<EngineInner<C>>,
}

impl<C: Clock> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

pub(crate) struct EngineInner<C: Clock> {
    pub(crate) state_dir: PathBuf,
    pub(crate) store: Mutex<EventStore<C>>,
    pub(crate) config: Mutex<ConfigStore>,
    pub(crate) adapters: HashMap<Tool, Arc<dyn ToolAdapter>>,
    hooks: Mutex<Arc<dyn EngineHooks>>,
    /// Edge-trigger guard: set while a kick loop is live.
    kicking: AtomicBool,
}

impl<C: Clock> Engine<C> {
    /// Open the state directory, run crash recovery, load config.
    pub fn open(
        config: EngineConfig,
        adapters: HashMap<Tool, Arc<dyn ToolAdapter>>,
        clock: C,
    ) -> Result<Self, OpError> {
        let mut store = EventStore::open(&config.state_dir, clock)?;
        let marked = store.recover_interrupted_jobs()?;
        if !marked.is_empty() {
            tracing::warn!(count = marked.len(), "jobs were running at crash time, marked unknown");
        }
        let cfg =
            ConfigStore::load_or_create(config.state_dir.join("config.json"), &config.owner_id)?;

        Ok(Self {
            inner: Arc::new(EngineInner {
                state_dir: config.state_dir,
                store: Mutex::new(store),
                config: Mutex::new(cfg),
                adapters,
                hooks: Mutex::new(Arc::new(NoopHooks)),
                kicking: AtomicBool::new(false),
            }),
        })
    }

    /// Register chat-surface callbacks.
    pub fn set_hooks(&self, hooks: Arc<dyn EngineHooks>) {
        *self.inner.hooks.lock() = hooks;
    }

    /// Edge-triggered kick; idempotent and safe to call redundantly.
    pub fn notify_new_work(&self) {
        EngineInner::notify(&self.inner);
    }

    /// Resolve once nothing is running and every queue is empty.
    pub async fn wait_for_idle(&self) {
        loop {
            if self.inner.store.lock().state().is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(IDLE_POLL_MS)).await;
        }
    }

    /// Deep copy of the projection, for status commands and tests.
    pub fn state_snapshot(&self) -> RuntimeState {
        self.inner.store.lock().snapshot_state()
    }
}

impl<C: Clock> EngineInner<C> {
    fn notify(inner: &Arc<Self>) {
        if !inner.kicking.swap(true, Ordering::SeqCst) {
            let inner = Arc::clone(inner);
            tokio::spawn(async move { inner.kick().await });
        }
    }

    /// The run loop: admit while capacity and runnable work exist, then
    /// clear the flag, re-checking afterwards so a wakeup that raced the
    /// clear is never lost.
    async fn kick(self: Arc<Self>) {
        loop {
            while let Some((thread_id, job_id)) = self.admit_next() {
                let inner = Arc::clone(&self);
                tokio::spawn(async move {
                    if let Err(e) = inner.run_job(&thread_id, &job_id).await {
                        tracing::error!(error = %e, job_id = %job_id, "job processing failed");
                    }
                    EngineInner::notify(&inner);
                });
            }

            self.kicking.store(false, Ordering::SeqCst);
            let more = {
                let store = self.store.lock();
                scheduler::has_capacity(store.state())
                    && scheduler::next_runnable(store.state()).is_some()
            };
            if !more || self.kicking.swap(true, Ordering::SeqCst) {
                break;
            }
        }
    }

    /// Admit one job: durable `job:started` under the store lock, then the
    /// started hook. Returns what the spawned task needs.
    fn admit_next(&self) -> Option<(String, JobId)> {
        let (thread_id, job_id, info) = {
            let mut store = self.store.lock();
            if !scheduler::has_capacity(store.state()) {
                return None;
            }
            let (thread_id, job_id) = scheduler::next_runnable(store.state())?;
            if let Err(e) = store
                .append(Event::JobStarted { thread_id: thread_id.clone(), job_id: job_id.clone() })
            {
                tracing::error!(error = %e, job_id = %job_id, "failed to persist job start");
                return None;
            }
            let info = store.state().jobs.get(&job_id).map(|job| JobStartedInfo {
                thread_id: thread_id.clone(),
                job_id: job_id.clone(),
                prompt: job.prompt.clone(),
                tool: job.tool,
                attempt: job.attempt,
            });
            (thread_id, job_id, info)
        };

        // A job that somehow isn't in the map still runs; run_job fail-safes.
        if let Some(info) = info {
            if let Err(e) = self.hooks().on_job_started(&info) {
                tracing::warn!(error = %e, "on_job_started hook failed");
            }
        }
        Some((thread_id, job_id))
    }

    pub(crate) fn hooks(&self) -> Arc<dyn EngineHooks> {
        Arc::clone(&self.hooks.lock())
    }

    async fn run_job(&self, thread_id: &str, job_id: &JobId) -> Result<(), StoreError> {
        // Resolve job + session from the projection.
        let resolved = {
            let store = self.store.lock();
            let state = store.state();
            match (state.jobs.get(job_id), state.sessions.get(thread_id)) {
                (Some(job), Some(session)) => Some((
                    job.prompt.clone(),
                    job.tool,
                    session.resume_key(job.tool).map(str::to_string),
                    session.project_name.clone(),
                )),
                _ => None,
            }
        };
        let Some((prompt, tool, resume_key, project_name)) = resolved else {
            return self.fail_job(
                thread_id,
                job_id,
                ErrorCode::AdapterParse,
                "job or session missing after start",
                None,
            );
        };

        let project = self.config.lock().project(&project_name).cloned();
        let Some(project) = project else {
            return self.fail_job(
                thread_id,
                job_id,
                ErrorCode::ProjectNotFound,
                format!("project not found: {project_name}"),
                None,
            );
        };

        let Some(adapter) = self.adapters.get(&tool).cloned() else {
            return self.fail_job(
                thread_id,
                job_id,
                ErrorCode::ToolNotEnabled,
                format!("no adapter registered for {tool}"),
                None,
            );
        };

        let hooks = self.hooks();
        let progress_thread = thread_id.to_string();
        let progress_job = job_id.clone();
        let req = RunRequest {
            prompt,
            cwd: project.path.clone(),
            timeout: Duration::from_secs(CLI_TIMEOUT_SEC),
            resume_key,
            extra_args: project.args_for(tool).to_vec(),
            progress: Some(Arc::new(move |event: ProgressEvent| {
                if let Err(e) = hooks.on_job_progress(&progress_thread, &progress_job, &event) {
                    tracing::warn!(error = %e, "on_job_progress hook failed");
                }
            })),
        };

        tracing::info!(job_id = %job_id, thread_id = %thread_id, tool = %tool, "running job");
        let outcome = adapter.run(req).await;

        if let Err(e) = job_log::write_job_log(&self.state_dir, job_id, &outcome) {
            tracing::warn!(error = %e, job_id = %job_id, "failed to write job log");
        }

        match &outcome.error {
            None => {
                let excerpt = result_excerpt(&outcome.assistant_text);
                self.store.lock().append(Event::JobCompleted {
                    thread_id: thread_id.to_string(),
                    job_id: job_id.clone(),
                    result_excerpt: excerpt.clone(),
                    adapter_state: outcome.adapter_state.clone(),
                })?;
                self.fire_finished(JobFinishedInfo {
                    thread_id: thread_id.to_string(),
                    job_id: job_id.clone(),
                    state: JobState::Success,
                    result_excerpt: Some(excerpt),
                    error_code: None,
                    error_message: None,
                });
                Ok(())
            }
            Some(failure) => self.fail_job(
                thread_id,
                job_id,
                failure.code,
                failure.message.clone(),
                (!outcome.adapter_state.is_empty()).then(|| outcome.adapter_state.clone()),
            ),
        }
    }

    fn fail_job(
        &self,
        thread_id: &str,
        job_id: &JobId,
        code: ErrorCode,
        message: impl Into<String>,
        adapter_state: Option<HashMap<String, String>>,
    ) -> Result<(), StoreError> {
        let message = message.into();
        tracing::warn!(job_id = %job_id, code = %code, message = %message, "job failed");
        self.store.lock().append(Event::JobFailed {
            thread_id: thread_id.to_string(),
            job_id: job_id.clone(),
            error_code: code,
            error_message: message.clone(),
            adapter_state,
        })?;
        self.fire_finished(JobFinishedInfo {
            thread_id: thread_id.to_string(),
            job_id: job_id.clone(),
            state: JobState::Failed,
            result_excerpt: None,
            error_code: Some(code),
            error_message: Some(message),
        });
        Ok(())
    }

    fn fire_finished(&self, info: JobFinishedInfo) {
        if let Err(e) = self.hooks().on_job_finished(&info) {
            tracing::warn!(error = %e, "on_job_finished hook failed");
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from event replay.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tether_core::{Envelope, Event, Job, JobId, JobState, Session};

/// In-memory projection of the event log.
///
/// Mutated only by [`RuntimeState::apply`]; callers that need a copy get a
/// deep clone so nothing outside the store can drift from the log.
///
/// # Idempotency
///
/// Every handler must be idempotent: applying the same event twice yields
/// the same state as applying it once. Inserts are guarded by existence
/// checks and transitions use assignment, not arithmetic.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Last applied sequence number; 0 before any event.
    pub seq: u64,
    pub sessions: HashMap<String, Session>,
    pub jobs: HashMap<JobId, Job>,
    /// `thread_id:message_id` → job, for exactly-once enqueue. Never pruned.
    pub dedupe: HashMap<String, JobId>,
}

/// Dedup key for a source chat message.
pub fn dedupe_key(thread_id: &str, message_id: &str) -> String {
    format!("{}:{}", thread_id, message_id)
}

impl RuntimeState {
    /// Count of jobs currently running across all sessions.
    pub fn running_count(&self) -> usize {
        self.sessions.values().filter(|s| s.running_job_id.is_some()).count()
    }

    /// True when nothing is running and every queue is empty.
    pub fn is_idle(&self) -> bool {
        self.sessions.values().all(|s| s.running_job_id.is_none() && s.queue.is_empty())
    }

    /// Apply an event to derive the next state.
    ///
    /// Pure with respect to its inputs: `(prior state, envelope) -> next
    /// state`, no clocks, no IO. This is what makes replay equivalent to
    /// the original execution.
    pub fn apply(&mut self, env: &Envelope) {
        self.seq = env.seq;
        match &env.event {
            // Audit only; project config lives in config.json.
            Event::ProjectCreated { .. } => {}

            Event::SessionCreated { thread_id, project_name, tool, adapter_state } => {
                if !self.sessions.contains_key(thread_id) {
                    self.sessions.insert(
                        thread_id.clone(),
                        Session::new(
                            thread_id.clone(),
                            project_name.clone(),
                            *tool,
                            adapter_state.clone(),
                            env.ts,
                        ),
                    );
                }
            }

            Event::ToolChanged { thread_id, tool } => {
                if let Some(session) = self.sessions.get_mut(thread_id) {
                    session.tool = *tool;
                    session.updated_at = env.ts;
                }
            }

            Event::JobEnqueued { thread_id, job_id, discord_message_id, prompt, tool, attempt } => {
                if self.jobs.contains_key(job_id) {
                    return;
                }
                self.jobs.insert(
                    job_id.clone(),
                    Job::enqueued(
                        job_id.clone(),
                        thread_id.clone(),
                        discord_message_id.clone(),
                        prompt.clone(),
                        *tool,
                        *attempt,
                    ),
                );
                self.dedupe
                    .insert(dedupe_key(thread_id, discord_message_id), job_id.clone());
                if let Some(session) = self.sessions.get_mut(thread_id) {
                    session.queue.push_back(job_id.clone());
                    session.last_activity_at = env.ts;
                    session.updated_at = env.ts;
                }
            }

            Event::JobStarted { thread_id, job_id } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.state = JobState::Running;
                    job.started_at = Some(env.ts);
                }
                if let Some(session) = self.sessions.get_mut(thread_id) {
                    if session.queue.front() == Some(job_id) {
                        session.queue.pop_front();
                    }
                    session.running_job_id = Some(job_id.clone());
                    session.updated_at = env.ts;
                }
            }

            Event::JobCompleted { thread_id, job_id, result_excerpt, adapter_state } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.state = JobState::Success;
                    job.finished_at = Some(env.ts);
                    job.result_excerpt = Some(result_excerpt.clone());
                }
                self.finish_on_session(thread_id, job_id, env, Some(adapter_state));
            }

            Event::JobFailed { thread_id, job_id, error_code, error_message, adapter_state } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.state = JobState::Failed;
                    job.finished_at = Some(env.ts);
                    job.error_code = Some(*error_code);
                    job.error_message = Some(error_message.clone());
                }
                self.finish_on_session(thread_id, job_id, env, adapter_state.as_ref());
            }

            Event::JobMarkedUnknownAfterCrash { thread_id, job_id } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.state = JobState::UnknownAfterCrash;
                    job.finished_at = Some(env.ts);
                }
                self.finish_on_session(thread_id, job_id, env, None);
            }
        }
    }

    fn finish_on_session(
        &mut self,
        thread_id: &str,
        job_id: &JobId,
        env: &Envelope,
        adapter_state: Option<&HashMap<String, String>>,
    ) {
        if let Some(session) = self.sessions.get_mut(thread_id) {
            if session.running_job_id.as_ref() == Some(job_id) {
                session.running_job_id = None;
            }
            session.last_job_id = Some(job_id.clone());
            if let Some(update) = adapter_state {
                for (key, value) in update {
                    session.adapter_state.insert(key.clone(), value.clone());
                }
            }
            session.updated_at = env.ts;
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single durable writer: log + snapshot + projection.
//!
//! All state mutation funnels through [`EventStore::append`]: assign the
//! next sequence number, make the envelope durable, then apply it to the
//! in-memory projection. Callers serialize access behind one mutex, which
//! is what keeps `seq` monotonic.

use crate::log::{EventLog, LogError};
use crate::snapshot::{load_snapshot, write_snapshot, Snapshot, SnapshotError};
use crate::state::RuntimeState;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tether_core::{Clock, Envelope, Event, JobId, JobState, SNAPSHOT_EVERY_EVENTS, SNAPSHOT_EVERY_SECONDS};
use thiserror::Error;

/// Errors from the event store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event log error: {0}")]
    Log(#[from] LogError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("snapshot seq {snapshot} is ahead of the event log ({log})")]
    SnapshotAhead { snapshot: u64, log: u64 },
}

/// Durable event store over a state directory.
#[derive(Debug)]
pub struct EventStore<C: Clock> {
    snapshot_path: PathBuf,
    log: EventLog,
    state: RuntimeState,
    clock: C,
    events_since_snapshot: u64,
    last_snapshot_at: Instant,
}

impl<C: Clock> EventStore<C> {
    /// Open the store: load the snapshot if present, replay the log tail.
    ///
    /// Does not touch jobs that were mid-flight; call
    /// [`EventStore::recover_interrupted_jobs`] after opening to resolve
    /// them. Replay gaps and unreadable snapshots are fatal.
    pub fn open(state_dir: &Path, clock: C) -> Result<Self, StoreError> {
        std::fs::create_dir_all(state_dir).map_err(LogError::Io)?;
        let snapshot_path = state_dir.join("snapshot.json");
        let log = EventLog::open(state_dir.join("events.ndjson"))?;

        let mut state = match load_snapshot(&snapshot_path)? {
            Some(snapshot) => {
                tracing::info!(
                    seq = snapshot.seq,
                    sessions = snapshot.sessions.len(),
                    jobs = snapshot.jobs.len(),
                    "loaded snapshot"
                );
                snapshot.into_state()
            }
            None => {
                tracing::info!("no snapshot found, starting with empty state");
                RuntimeState::default()
            }
        };

        if state.seq > log.write_seq() {
            return Err(StoreError::SnapshotAhead { snapshot: state.seq, log: log.write_seq() });
        }

        let tail = log.entries_after(state.seq)?;
        let replayed = tail.len();
        for env in &tail {
            state.apply(env);
        }
        if replayed > 0 {
            tracing::info!(replayed, seq = state.seq, "replayed log tail");
        }

        Ok(Self {
            snapshot_path,
            log,
            state,
            clock: clock.clone(),
            events_since_snapshot: 0,
            last_snapshot_at: clock.now(),
        })
    }

    /// The live projection. Read-only; mutation goes through `append`.
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Deep copy for hand-out across the store boundary.
    pub fn snapshot_state(&self) -> RuntimeState {
        self.state.clone()
    }

    /// Append an event: durable write first, then apply, then maybe snapshot.
    pub fn append(&mut self, event: Event) -> Result<Envelope, StoreError> {
        let env = Envelope { seq: self.state.seq + 1, ts: self.clock.now_utc(), event };
        self.log.append(&env)?;
        tracing::debug!(seq = env.seq, "{}", env.event.log_summary());
        self.state.apply(&env);

        self.events_since_snapshot += 1;
        if self.snapshot_due() {
            self.write_snapshot_now()?;
        }
        Ok(env)
    }

    /// Transition every `running` job to `unknown_after_crash`.
    ///
    /// Startup-only. The outcome of a job that was mid-flight when the
    /// process died is unknowable; the operator decides whether to retry.
    /// Idempotent: a second pass finds no running jobs.
    pub fn recover_interrupted_jobs(&mut self) -> Result<Vec<JobId>, StoreError> {
        let mut interrupted: Vec<(String, JobId)> = self
            .state
            .jobs
            .values()
            .filter(|j| j.state == JobState::Running)
            .map(|j| (j.thread_id.clone(), j.job_id.clone()))
            .collect();
        interrupted.sort();

        let mut marked = Vec::with_capacity(interrupted.len());
        for (thread_id, job_id) in interrupted {
            tracing::warn!(job_id = %job_id, thread_id = %thread_id, "marking interrupted job");
            self.append(Event::JobMarkedUnknownAfterCrash {
                thread_id,
                job_id: job_id.clone(),
            })?;
            marked.push(job_id);
        }
        Ok(marked)
    }

    /// Force a snapshot regardless of cadence.
    pub fn write_snapshot_now(&mut self) -> Result<(), StoreError> {
        write_snapshot(&self.snapshot_path, &Snapshot::of(&self.state, self.clock.now_utc()))?;
        self.events_since_snapshot = 0;
        self.last_snapshot_at = self.clock.now();
        tracing::debug!(seq = self.state.seq, "snapshot written");
        Ok(())
    }

    fn snapshot_due(&self) -> bool {
        if self.events_since_snapshot == 0 {
            return false;
        }
        self.events_since_snapshot >= SNAPSHOT_EVERY_EVENTS
            || self.clock.now().duration_since(self.last_snapshot_at).as_secs()
                >= SNAPSHOT_EVERY_SECONDS
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

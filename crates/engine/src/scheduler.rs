// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pick-next policy over the replayed state.
//!
//! Jobs within a thread are strictly FIFO and at most one job per thread
//! runs at a time. Across threads, the session idle the longest goes
//! first, with a lexicographic thread-id tie-break so tests are
//! deterministic.

use tether_core::{JobId, GLOBAL_MAX_RUNNING};
use tether_storage::RuntimeState;

/// True while another job may be admitted under the global cap.
pub fn has_capacity(state: &RuntimeState) -> bool {
    state.running_count() < GLOBAL_MAX_RUNNING
}

/// The next `(thread_id, job_id)` to run, if any thread is runnable.
///
/// A thread is runnable when it has queued work and nothing running.
pub fn next_runnable(state: &RuntimeState) -> Option<(String, JobId)> {
    state
        .sessions
        .values()
        .filter(|s| s.running_job_id.is_none() && !s.queue.is_empty())
        .min_by(|a, b| {
            a.last_activity_at
                .cmp(&b.last_activity_at)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        })
        .and_then(|s| s.queue.front().map(|job_id| (s.thread_id.clone(), job_id.clone())))
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

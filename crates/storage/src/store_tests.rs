// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::tempdir;
use tether_core::{FakeClock, JobState, Tool};

fn open(dir: &Path, clock: &FakeClock) -> EventStore<FakeClock> {
    EventStore::open(dir, clock.clone()).unwrap()
}

fn session_created(thread: &str) -> Event {
    Event::SessionCreated {
        thread_id: thread.into(),
        project_name: "acme".into(),
        tool: Tool::Claude,
        adapter_state: HashMap::new(),
    }
}

fn enqueued(thread: &str, job: &str) -> Event {
    Event::JobEnqueued {
        thread_id: thread.into(),
        job_id: JobId::new(job),
        discord_message_id: format!("m-{job}"),
        prompt: "hello".into(),
        tool: Tool::Claude,
        attempt: 1,
    }
}

fn started(thread: &str, job: &str) -> Event {
    Event::JobStarted { thread_id: thread.into(), job_id: JobId::new(job) }
}

fn completed(thread: &str, job: &str, key: &str) -> Event {
    Event::JobCompleted {
        thread_id: thread.into(),
        job_id: JobId::new(job),
        result_excerpt: "done".into(),
        adapter_state: HashMap::from([("session_id".to_string(), key.to_string())]),
    }
}

#[test]
fn append_assigns_increasing_seq() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut store = open(dir.path(), &clock);

    let e1 = store.append(session_created("t1")).unwrap();
    let e2 = store.append(enqueued("t1", "job-1")).unwrap();

    assert_eq!(e1.seq, 1);
    assert_eq!(e2.seq, 2);
    assert_eq!(store.state().seq, 2);
}

#[test]
fn crash_recovery_marks_running_jobs() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    {
        let mut store = open(dir.path(), &clock);
        store.append(session_created("t1")).unwrap();
        store.append(enqueued("t1", "job-1")).unwrap();
        store.append(started("t1", "job-1")).unwrap();
        store.write_snapshot_now().unwrap();
    }

    // Reopen the store and run recovery
    let mut store = open(dir.path(), &clock);
    let marked = store.recover_interrupted_jobs().unwrap();

    assert_eq!(marked, vec![JobId::new("job-1")]);
    assert_eq!(store.state().jobs[&JobId::new("job-1")].state, JobState::UnknownAfterCrash);
    assert!(store.state().sessions["t1"].running_job_id.is_none());
}

#[test]
fn crash_recovery_is_idempotent() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    {
        let mut store = open(dir.path(), &clock);
        store.append(session_created("t1")).unwrap();
        store.append(enqueued("t1", "job-1")).unwrap();
        store.append(started("t1", "job-1")).unwrap();
    }

    let mut store = open(dir.path(), &clock);
    let first = store.recover_interrupted_jobs().unwrap();
    let second = store.recover_interrupted_jobs().unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());

    // State matches a fresh replay of the full log
    let replayed = open(dir.path(), &clock);
    assert_eq!(replayed.state(), store.state());
}

#[test]
fn pure_replay_without_snapshot_matches() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    {
        let mut store = open(dir.path(), &clock);
        store.append(session_created("t1")).unwrap();
        store.append(enqueued("t1", "job-1")).unwrap();
        store.append(started("t1", "job-1")).unwrap();
        store.append(completed("t1", "job-1", "kx")).unwrap();
        store.write_snapshot_now().unwrap();
    }

    // Delete the snapshot and replay from the log alone
    std::fs::remove_file(dir.path().join("snapshot.json")).unwrap();
    let store = open(dir.path(), &clock);

    assert_eq!(store.state().jobs[&JobId::new("job-1")].state, JobState::Success);
    assert_eq!(store.state().sessions["t1"].adapter_state["session_id"], "kx");
}

#[test]
fn snapshot_plus_tail_equals_full_replay() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    {
        let mut store = open(dir.path(), &clock);
        store.append(session_created("t1")).unwrap();
        store.append(enqueued("t1", "job-1")).unwrap();
        store.write_snapshot_now().unwrap();
        // Tail not covered by the snapshot
        store.append(started("t1", "job-1")).unwrap();
        store.append(completed("t1", "job-1", "k1")).unwrap();
    }

    let with_snapshot = open(dir.path(), &clock).snapshot_state();

    std::fs::remove_file(dir.path().join("snapshot.json")).unwrap();
    let from_scratch = open(dir.path(), &clock).snapshot_state();

    assert_eq!(with_snapshot, from_scratch);
}

#[test]
fn snapshot_after_event_threshold() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut store = open(dir.path(), &clock);

    store.append(session_created("t1")).unwrap();
    for i in 0..SNAPSHOT_EVERY_EVENTS {
        store.append(enqueued("t1", &format!("job-{i}"))).unwrap();
    }

    let snapshot = load_snapshot(&dir.path().join("snapshot.json")).unwrap().unwrap();
    assert!(snapshot.seq >= SNAPSHOT_EVERY_EVENTS);
}

#[test]
fn snapshot_after_interval_with_pending_events() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut store = open(dir.path(), &clock);

    store.append(session_created("t1")).unwrap();
    assert!(load_snapshot(&dir.path().join("snapshot.json")).unwrap().is_none());

    clock.advance(Duration::from_secs(SNAPSHOT_EVERY_SECONDS));
    store.append(enqueued("t1", "job-1")).unwrap();

    let snapshot = load_snapshot(&dir.path().join("snapshot.json")).unwrap().unwrap();
    assert_eq!(snapshot.seq, 2);
}

#[test]
fn no_snapshot_when_interval_passes_without_events() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let mut store = open(dir.path(), &clock);

    store.append(session_created("t1")).unwrap();
    store.write_snapshot_now().unwrap();
    let before = std::fs::read(dir.path().join("snapshot.json")).unwrap();

    clock.advance(Duration::from_secs(SNAPSHOT_EVERY_SECONDS * 3));
    // Nothing appended; cadence alone must not rewrite the snapshot. The
    // next append does.
    let after = std::fs::read(dir.path().join("snapshot.json")).unwrap();
    assert_eq!(before, after);

    store.append(enqueued("t1", "job-1")).unwrap();
    let snapshot = load_snapshot(&dir.path().join("snapshot.json")).unwrap().unwrap();
    assert_eq!(snapshot.seq, 2);
}

#[test]
fn snapshot_ahead_of_log_is_fatal() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    {
        let mut store = open(dir.path(), &clock);
        store.append(session_created("t1")).unwrap();
        store.write_snapshot_now().unwrap();
    }
    // Truncate the log behind the snapshot
    std::fs::write(dir.path().join("events.ndjson"), b"").unwrap();

    let err = EventStore::open(dir.path(), clock).unwrap_err();
    assert!(matches!(err, StoreError::SnapshotAhead { snapshot: 1, log: 0 }));
}

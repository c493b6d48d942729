// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use std::collections::HashMap;
use tempfile::tempdir;
use tether_core::{Envelope, Event, Tool};

fn populated_state() -> RuntimeState {
    let mut state = RuntimeState::default();
    state.apply(&Envelope {
        seq: 1,
        ts: Utc.timestamp_opt(1_760_000_000, 0).unwrap(),
        event: Event::SessionCreated {
            thread_id: "t1".into(),
            project_name: "acme".into(),
            tool: Tool::Claude,
            adapter_state: HashMap::new(),
        },
    });
    state
}

#[test]
fn missing_snapshot_is_none() {
    let dir = tempdir().unwrap();
    let loaded = load_snapshot(&dir.path().join("snapshot.json")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn write_then_load_round_trips_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let state = populated_state();

    write_snapshot(&path, &Snapshot::of(&state, Utc::now())).unwrap();

    let loaded = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(loaded.seq, 1);
    assert_eq!(loaded.into_state(), state);
}

#[test]
fn write_replaces_atomically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let mut state = populated_state();

    write_snapshot(&path, &Snapshot::of(&state, Utc::now())).unwrap();
    state.seq = 2;
    write_snapshot(&path, &Snapshot::of(&state, Utc::now())).unwrap();

    let loaded = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 2);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn snapshot_without_seq_is_unusable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, br#"{"version":1,"sessions":{},"jobs":{},"dedupe":{}}"#).unwrap();

    assert!(load_snapshot(&path).is_err());
}

#[test]
fn future_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let state = populated_state();
    let mut snapshot = Snapshot::of(&state, Utc::now());
    snapshot.version = 9;
    write_snapshot(&path, &snapshot).unwrap();

    let err = load_snapshot(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::UnsupportedVersion(9)));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for fast startup.
//!
//! A snapshot is the full projection at a point in the log, identified by
//! the sequence number it covers. Startup loads the snapshot and replays
//! only the log entries after that sequence. The stored `seq` is
//! authoritative: a snapshot without one cannot be used and aborts startup
//! rather than guessing a replay point.

use crate::state::RuntimeState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tether_core::{Job, JobId, Session};
use thiserror::Error;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Errors from snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// The projection as written to `snapshot.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version for migrations
    pub version: u32,
    /// Log sequence number this snapshot covers
    pub seq: u64,
    pub sessions: HashMap<String, Session>,
    pub jobs: HashMap<JobId, Job>,
    pub dedupe: HashMap<String, JobId>,
    /// When this snapshot was created
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn of(state: &RuntimeState, created_at: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            seq: state.seq,
            sessions: state.sessions.clone(),
            jobs: state.jobs.clone(),
            dedupe: state.dedupe.clone(),
            created_at,
        }
    }

    pub fn into_state(self) -> RuntimeState {
        RuntimeState {
            seq: self.seq,
            sessions: self.sessions,
            jobs: self.jobs,
            dedupe: self.dedupe,
        }
    }
}

/// Load the snapshot if one exists.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version != CURRENT_SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }
    Ok(Some(snapshot))
}

/// Write the snapshot atomically: temp file, fsync, rename.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&serde_json::to_vec(snapshot)?)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event log (`events.ndjson`).
//!
//! One JSON envelope per line. Appends hit disk (flush + fsync) before the
//! call returns; an event the caller has seen acknowledged survives a crash.
//! Reads fail fast on anything that would make replay ambiguous: unparsable
//! lines, duplicate sequence numbers, gaps. Corruption here means the
//! projection can no longer be trusted, and refusing to start beats silent
//! state drift.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tether_core::Envelope;
use thiserror::Error;

/// Errors from event log operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt event log at line {line}: {message}")]
    Corrupt { line: usize, message: String },
    #[error("sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },
    #[error("appended out of order: last {last}, got {got}")]
    OutOfOrder { last: u64, got: u64 },
}

/// Append-only NDJSON writer plus validating reader.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Highest sequence number present in the file.
    write_seq: u64,
}

impl EventLog {
    /// Open (or create) the log, scanning it once to learn the last seq.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let write_seq = match std::fs::metadata(&path) {
            Ok(_) => scan_last_seq(&path)?,
            Err(_) => 0,
        };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: BufWriter::new(file), write_seq })
    }

    /// Highest sequence number on disk.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Append one envelope and make it durable before returning.
    pub fn append(&mut self, env: &Envelope) -> Result<(), LogError> {
        if env.seq != self.write_seq + 1 {
            return Err(LogError::OutOfOrder { last: self.write_seq, got: env.seq });
        }
        let line = serde_json::to_string(env)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.write_seq = env.seq;
        Ok(())
    }

    /// Read every envelope with `seq > from`, validating contiguity.
    ///
    /// Entries at or below `from` are skipped (they are covered by the
    /// snapshot); the remainder must climb by exactly one per line.
    pub fn entries_after(&self, from: u64) -> Result<Vec<Envelope>, LogError> {
        read_entries_after(&self.path, from)
    }
}

fn scan_last_seq(path: &Path) -> Result<u64, LogError> {
    // Full validating pass; also catches gaps before we ever append.
    let entries = read_entries_after(path, 0)?;
    Ok(entries.last().map(|e| e.seq).unwrap_or(0))
}

fn read_entries_after(path: &Path, from: u64) -> Result<Vec<Envelope>, LogError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut last_seq: Option<u64> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let env: Envelope = serde_json::from_str(&line).map_err(|e| LogError::Corrupt {
            line: line_no,
            message: e.to_string(),
        })?;

        if let Some(last) = last_seq {
            if env.seq <= last {
                return Err(LogError::Corrupt {
                    line: line_no,
                    message: format!("duplicate or regressing seq {} after {}", env.seq, last),
                });
            }
            if env.seq != last + 1 {
                return Err(LogError::SequenceGap { expected: last + 1, found: env.seq });
            }
        }
        last_seq = Some(env.seq);

        if env.seq > from {
            entries.push(env);
        }
    }

    // A log that starts past seq 1 with no snapshot covering the prefix is
    // a gap too; the caller passes `from` = snapshot seq.
    if let Some(first) = entries.first() {
        if first.seq != from + 1 {
            return Err(LogError::SequenceGap { expected: from + 1, found: first.seq });
        }
    }

    Ok(entries)
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;

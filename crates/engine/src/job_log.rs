// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job capture files under `logs/job/`.

use std::io::Write;
use std::path::{Path, PathBuf};
use tether_adapters::RunOutcome;
use tether_core::JobId;

/// Write everything a run captured to `logs/job/<job_id>.log`.
///
/// Plain text, one captured line per line, prefixed with the stream it
/// came from. Written whether the run succeeded or not; partial output
/// from a timed-out tool lands here too.
pub fn write_job_log(
    state_dir: &Path,
    job_id: &JobId,
    outcome: &RunOutcome,
) -> std::io::Result<PathBuf> {
    let dir = state_dir.join("logs").join("job");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{job_id}.log"));

    let mut file = std::fs::File::create(&path)?;
    for line in &outcome.stdout_lines {
        writeln!(file, "[stdout] {line}")?;
    }
    for line in &outcome.stderr_lines {
        writeln!(file, "[stderr] {line}")?;
    }
    for line in &outcome.diagnostics {
        writeln!(file, "[diagnostic] {line}")?;
    }
    Ok(path)
}

#[cfg(test)]
#[path = "job_log_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process capture: spawn argv, stream both pipes, enforce a deadline.
//!
//! The command is spawned directly from argv; nothing here passes through
//! a shell. Stdin is closed so a tool that decides to prompt interactively
//! sees EOF instead of hanging the job.

use crate::lines::LineBuffer;
use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// How long to keep reading the pipes after the child is gone. A grandchild
/// that inherited the pipe can hold it open forever; captured output is
/// preserved, the stalled reader is not waited on.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// How the child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Exited(i32),
    /// Killed by a signal not sent by us.
    Signaled,
    /// Deadline hit; the child was SIGKILLed.
    TimedOut,
}

/// Everything captured from one child process run.
#[derive(Debug)]
pub struct Captured {
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub exit: ExitKind,
}

/// Callback invoked with each complete stdout line as it arrives.
pub type StdoutLineFn = Box<dyn FnMut(&str) + Send>;

/// Spawn `program` with `args`, capture line-buffered output, kill at deadline.
///
/// Partial trailing lines on either stream are emitted when the stream
/// closes. The spawn error (missing binary, bad cwd) is the only `Err`
/// path; anything after a successful spawn is reported in [`Captured`].
pub async fn run_command(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
    on_stdout_line: StdoutLineFn,
) -> std::io::Result<Captured> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().ok_or_else(broken_pipe)?;
    let stderr = child.stderr.take().ok_or_else(broken_pipe)?;

    let stdout_sink: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let stderr_sink: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let out_task = tokio::spawn(drain(stdout, Arc::clone(&stdout_sink), Some(on_stdout_line)));
    let err_task = tokio::spawn(drain(stderr, Arc::clone(&stderr_sink), None));

    let mut timed_out = false;
    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(waited) => waited?,
        Err(_) => {
            timed_out = true;
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, program, "failed to kill timed-out child");
            }
            child.wait().await?
        }
    };

    await_drain(out_task).await;
    await_drain(err_task).await;

    let stdout_lines = std::mem::take(&mut *stdout_sink.lock());
    let stderr_lines = std::mem::take(&mut *stderr_sink.lock());

    let exit = if timed_out {
        ExitKind::TimedOut
    } else {
        match status.code() {
            Some(code) => ExitKind::Exited(code),
            None => ExitKind::Signaled,
        }
    };

    Ok(Captured { stdout_lines, stderr_lines, exit })
}

async fn drain<R>(mut reader: R, sink: Arc<Mutex<Vec<String>>>, mut on_line: Option<StdoutLineFn>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = LineBuffer::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                for line in buf.push(&chunk[..n]) {
                    if let Some(f) = on_line.as_mut() {
                        f(&line);
                    }
                    sink.lock().push(line);
                }
            }
        }
    }
    if let Some(tail) = buf.finish() {
        if let Some(f) = on_line.as_mut() {
            f(&tail);
        }
        sink.lock().push(tail);
    }
}

async fn await_drain(mut task: tokio::task::JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
        task.abort();
    }
}

fn broken_pipe() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child pipe not captured")
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

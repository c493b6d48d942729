// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-adapters: the bridge between the engine and the coding CLIs.
//!
//! One adapter per tool. Each knows how to build the tool's argv (including
//! the resume flag), parse its NDJSON output dialect, pull out the
//! session-continuation key, and classify failures into stable error codes.
//! Non-JSON diagnostic lines interleaved with events are preserved, never
//! fatal.

pub mod claude;
pub mod codex;
pub mod cursor;
pub mod lines;
pub mod process;
pub mod text;

pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use cursor::CursorAdapter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{ErrorCode, Tool};

/// One tool invocation.
#[derive(Clone)]
pub struct RunRequest {
    pub prompt: String,
    /// Project directory the tool runs in.
    pub cwd: PathBuf,
    pub timeout: Duration,
    /// Continuation key from a previous run, if the session has one.
    pub resume_key: Option<String>,
    /// Project-configured extra argv entries, passed verbatim.
    pub extra_args: Vec<String>,
    /// Streaming callback; best-effort, never aborts the run.
    pub progress: Option<ProgressFn>,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            cwd: cwd.into(),
            timeout: Duration::from_secs(tether_core::CLI_TIMEOUT_SEC),
            resume_key: None,
            extra_args: Vec::new(),
            progress: None,
        }
    }
}

/// Streaming progress callback.
pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Introspective activity kinds surfaced while a tool works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Thinking,
    Tool,
}

/// A streaming signal from a running tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A visible assistant message fragment.
    AssistantText { text: String },
    /// Something the tool is doing, worth showing but not keeping.
    Activity { activity: Activity, label: String },
}

/// Failure classification carried on a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl AdapterFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Everything a run produced, success or not.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub ok: bool,
    /// Final assistant text (document order, consecutive duplicates dropped).
    pub assistant_text: String,
    /// Tool-namespaced continuation keys to merge into the session.
    pub adapter_state: HashMap<String, String>,
    /// Stdout lines that were not structured events.
    pub diagnostics: Vec<String>,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub error: Option<AdapterFailure>,
}

impl RunOutcome {
    /// Outcome for a process that could not be spawned at all.
    pub fn spawn_failure(err: &std::io::Error) -> Self {
        Self {
            ok: false,
            error: Some(AdapterFailure::new(
                ErrorCode::CliExitNonzero,
                format!("failed to spawn tool: {err}"),
            )),
            ..Self::default()
        }
    }
}

/// Capability contract shared by the three adapters.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn tool(&self) -> Tool;
    async fn run(&self, req: RunRequest) -> RunOutcome;
}

/// Static tool → adapter mapping with default programs.
pub fn default_registry() -> HashMap<Tool, Arc<dyn ToolAdapter>> {
    HashMap::from([
        (Tool::Claude, Arc::new(ClaudeAdapter::default()) as Arc<dyn ToolAdapter>),
        (Tool::Codex, Arc::new(CodexAdapter::default()) as Arc<dyn ToolAdapter>),
        (Tool::Cursor, Arc::new(CursorAdapter::default()) as Arc<dyn ToolAdapter>),
    ])
}

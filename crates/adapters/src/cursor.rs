// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the `cursor-agent` CLI (stream-json output).
//!
//! An `init` event announces the `session_id`; assistant `message` events
//! carry deltas (or loosely shaped text fields); a `result` event with a
//! `status` string marks completion and is required; a stream that ends
//! without one is not trusted as a finished run.
//!
//! This is the one adapter with an automatic retry: exactly one, on a
//! nonzero exit whose combined output looks like a transient provider
//! failure (quota, rate limit, 429). Everything else surfaces immediately.

use crate::process::{run_command, Captured, ExitKind, StdoutLineFn};
use crate::text::{extract_text, has_transient_hint, looks_like_json, push_deduped};
use crate::{AdapterFailure, ProgressEvent, ProgressFn, RunOutcome, RunRequest, ToolAdapter};
use async_trait::async_trait;
use serde_json::Value;
use tether_core::{ErrorCode, Tool};

pub struct CursorAdapter {
    pub program: String,
}

impl Default for CursorAdapter {
    fn default() -> Self {
        Self { program: "cursor-agent".to_string() }
    }
}

impl CursorAdapter {
    pub(crate) fn build_argv(&self, req: &RunRequest) -> Vec<String> {
        let mut argv: Vec<String> =
            vec!["-p".to_string(), req.prompt.clone(), "--output-format".to_string(), "stream-json".to_string()];
        argv.extend(req.extra_args.iter().cloned());
        if let Some(key) = &req.resume_key {
            argv.push("--resume".to_string());
            argv.push(key.clone());
        }
        argv
    }

    pub(crate) fn classify(captured: Captured, timeout_secs: u64) -> RunOutcome {
        let mut chunks: Vec<String> = Vec::new();
        let mut session_id: Option<String> = None;
        let mut status: Option<String> = None;
        let mut diagnostics = Vec::new();
        let mut parsed = 0usize;
        let mut parse_failures = 0usize;

        for line in &captured.stdout_lines {
            if !looks_like_json(line) {
                diagnostics.push(line.clone());
                continue;
            }
            let value: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(_) => {
                    parse_failures += 1;
                    continue;
                }
            };
            parsed += 1;

            if let Some(sid) = value.get("session_id").and_then(Value::as_str) {
                if !sid.is_empty() {
                    session_id = Some(sid.to_string());
                }
            }

            match value.get("type").and_then(Value::as_str) {
                Some("message") => {
                    if value.get("role").and_then(Value::as_str) == Some("assistant") {
                        let text = match value.get("delta").and_then(Value::as_str) {
                            Some(delta) => Some(delta.to_string()),
                            None => extract_text(&value),
                        };
                        if let Some(text) = text {
                            push_deduped(&mut chunks, &text);
                        }
                    }
                }
                Some("result") => {
                    if let Some(s) = value.get("status").and_then(Value::as_str) {
                        status = Some(s.to_string());
                    }
                }
                _ => {}
            }
        }

        let mut adapter_state = std::collections::HashMap::new();
        if let Some(sid) = &session_id {
            adapter_state.insert("session_id".to_string(), sid.clone());
        }

        let error = match captured.exit {
            ExitKind::TimedOut => Some(AdapterFailure::new(
                ErrorCode::CliTimeout,
                format!("tool timed out after {timeout_secs}s"),
            )),
            ExitKind::Signaled => {
                Some(AdapterFailure::new(ErrorCode::CliExitNonzero, "tool killed by signal"))
            }
            ExitKind::Exited(code) if code != 0 => Some(AdapterFailure::new(
                ErrorCode::CliExitNonzero,
                match captured.stderr_lines.last() {
                    Some(last) if !last.is_empty() => format!("exit status {code}: {last}"),
                    _ => format!("exit status {code}"),
                },
            )),
            ExitKind::Exited(_) => {
                if parsed == 0 && parse_failures > 0 {
                    Some(AdapterFailure::new(
                        ErrorCode::AdapterParse,
                        "no parsable events in tool output",
                    ))
                } else {
                    match status.as_deref() {
                        None => Some(AdapterFailure::new(
                            ErrorCode::AdapterMissingResult,
                            "stream ended without a result event",
                        )),
                        Some("success") => {
                            if session_id.is_none() {
                                Some(AdapterFailure::new(
                                    ErrorCode::AdapterSessionKeyMissing,
                                    "tool finished without reporting a session_id",
                                ))
                            } else {
                                None
                            }
                        }
                        Some(other) => Some(AdapterFailure::new(
                            ErrorCode::CliExitNonzero,
                            format!("tool reported status {other:?}"),
                        )),
                    }
                }
            }
        };

        RunOutcome {
            ok: error.is_none(),
            // Deltas are fragments of one message; concatenate without joins.
            assistant_text: chunks.concat(),
            adapter_state,
            diagnostics,
            stdout_lines: captured.stdout_lines,
            stderr_lines: captured.stderr_lines,
            error,
        }
    }

    async fn attempt(&self, argv: &[String], req: &RunRequest) -> (RunOutcome, Option<ExitKind>) {
        let progress = req.progress.clone();
        let on_line: StdoutLineFn = Box::new(move |line| emit_stream(line, &progress));

        match run_command(&self.program, argv, &req.cwd, req.timeout, on_line).await {
            Ok(captured) => {
                let exit = captured.exit;
                (Self::classify(captured, req.timeout.as_secs()), Some(exit))
            }
            Err(e) => {
                tracing::error!(error = %e, program = %self.program, "spawn failed");
                (RunOutcome::spawn_failure(&e), None)
            }
        }
    }
}

fn emit_stream(line: &str, progress: &Option<ProgressFn>) {
    let Some(progress) = progress else { return };
    if !looks_like_json(line) {
        return;
    }
    let Ok(value) = serde_json::from_str::<Value>(line) else { return };
    if value.get("type").and_then(Value::as_str) != Some("message")
        || value.get("role").and_then(Value::as_str) != Some("assistant")
    {
        return;
    }
    let text = match value.get("delta").and_then(Value::as_str) {
        Some(delta) => Some(delta.to_string()),
        None => extract_text(&value),
    };
    if let Some(text) = text {
        if !text.is_empty() {
            progress(ProgressEvent::AssistantText { text });
        }
    }
}

fn looks_transient(outcome: &RunOutcome) -> bool {
    let combined = outcome
        .stdout_lines
        .iter()
        .chain(outcome.stderr_lines.iter())
        .chain(outcome.diagnostics.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    has_transient_hint(&combined)
}

#[async_trait]
impl ToolAdapter for CursorAdapter {
    fn tool(&self) -> Tool {
        Tool::Cursor
    }

    async fn run(&self, req: RunRequest) -> RunOutcome {
        let argv = self.build_argv(&req);

        let (outcome, exit) = self.attempt(&argv, &req).await;
        let nonzero_exit = matches!(exit, Some(ExitKind::Exited(code)) if code != 0);
        if nonzero_exit && looks_transient(&outcome) {
            tracing::info!(program = %self.program, "transient failure, retrying once");
            return self.attempt(&argv, &req).await.0;
        }
        outcome
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;

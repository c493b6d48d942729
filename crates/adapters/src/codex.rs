// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the `codex` CLI (exec --json output).
//!
//! Events wrap items: `{"type":"item.started","item":{"type":...}}`.
//! Assistant text arrives as `agent_message` items (often once at start and
//! again at completion, which the duplicate suppression collapses). The
//! conversation key is a `thread_id`, announced by `thread.started` but
//! accepted from any event carrying one.

use crate::process::{run_command, Captured, ExitKind, StdoutLineFn};
use crate::text::{looks_like_json, push_deduped};
use crate::{Activity, AdapterFailure, ProgressEvent, ProgressFn, RunOutcome, RunRequest, ToolAdapter};
use async_trait::async_trait;
use serde_json::Value;
use tether_core::{ErrorCode, Tool};

pub struct CodexAdapter {
    pub program: String,
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self { program: "codex".to_string() }
    }
}

impl CodexAdapter {
    pub(crate) fn build_argv(&self, req: &RunRequest) -> Vec<String> {
        let mut argv: Vec<String> =
            ["exec", "--dangerously-bypass-approvals-and-sandbox"].map(String::from).to_vec();
        if let Some(key) = &req.resume_key {
            argv.push("resume".to_string());
            argv.push(key.clone());
        }
        argv.push("--json".to_string());
        argv.extend(req.extra_args.iter().cloned());
        argv.push(req.prompt.clone());
        argv
    }

    pub(crate) fn classify(captured: Captured, timeout_secs: u64) -> RunOutcome {
        let mut chunks: Vec<String> = Vec::new();
        let mut thread_id: Option<String> = None;
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

            if let Some(tid) = value.get("thread_id").and_then(Value::as_str) {
                if !tid.is_empty() {
                    thread_id = Some(tid.to_string());
                }
            }

            if is_item_event(&value) {
                let item = &value["item"];
                if item.get("type").and_then(Value::as_str) == Some("agent_message") {
                    if let Some(text) = item.get("text").and_then(Value::as_str) {
                        push_deduped(&mut chunks, text);
                    }
                }
            }
        }

        let mut adapter_state = std::collections::HashMap::new();
        if let Some(tid) = &thread_id {
            adapter_state.insert("thread_id".to_string(), tid.clone());
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
                } else if thread_id.is_none() {
                    Some(AdapterFailure::new(
                        ErrorCode::AdapterSessionKeyMissing,
                        "tool finished without reporting a thread_id",
                    ))
                } else {
                    None
                }
            }
        };

        RunOutcome {
            ok: error.is_none(),
            assistant_text: chunks.join("\n"),
            adapter_state,
            diagnostics,
            stdout_lines: captured.stdout_lines,
            stderr_lines: captured.stderr_lines,
            error,
        }
    }
}

fn is_item_event(value: &Value) -> bool {
    matches!(
        value.get("type").and_then(Value::as_str),
        Some("item.started") | Some("item.completed")
    )
}

/// Label for a command_execution item: shell wrappers collapse to "bash",
/// anything else uses the basename of the first token.
fn command_label(command: &str) -> String {
    if command.contains("/bin/zsh") || command.contains("/bin/bash") {
        return "bash".to_string();
    }
    command
        .split_whitespace()
        .next()
        .map(|token| token.rsplit('/').next().unwrap_or(token))
        .filter(|name| !name.is_empty())
        .unwrap_or("tool")
        .to_string()
}

fn emit_stream(line: &str, progress: &Option<ProgressFn>) {
    let Some(progress) = progress else { return };
    if !looks_like_json(line) {
        return;
    }
    let Ok(value) = serde_json::from_str::<Value>(line) else { return };
    if !is_item_event(&value) {
        return;
    }
    let item = &value["item"];
    match item.get("type").and_then(Value::as_str) {
        Some("agent_message") => {
            if let Some(text) = item.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    progress(ProgressEvent::AssistantText { text: text.to_string() });
                }
            }
        }
        Some("reasoning") => {
            progress(ProgressEvent::Activity {
                activity: Activity::Thinking,
                label: "reasoning".to_string(),
            });
        }
        Some("command_execution") => {
            let label = item
                .get("command")
                .and_then(Value::as_str)
                .map(command_label)
                .unwrap_or_else(|| "tool".to_string());
            progress(ProgressEvent::Activity { activity: Activity::Tool, label });
        }
        _ => {}
    }
}

#[async_trait]
impl ToolAdapter for CodexAdapter {
    fn tool(&self) -> Tool {
        Tool::Codex
    }

    async fn run(&self, req: RunRequest) -> RunOutcome {
        let argv = self.build_argv(&req);
        let progress = req.progress.clone();
        let on_line: StdoutLineFn = Box::new(move |line| emit_stream(line, &progress));

        match run_command(&self.program, &argv, &req.cwd, req.timeout, on_line).await {
            Ok(captured) => Self::classify(captured, req.timeout.as_secs()),
            Err(e) => {
                tracing::error!(error = %e, program = %self.program, "spawn failed");
                RunOutcome::spawn_failure(&e)
            }
        }
    }
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter for the `claude` CLI (stream-json output).
//!
//! Events are JSON lines with a top-level `type`. Assistant turns carry a
//! `message.content[]` array of text / tool_use / thinking blocks; a final
//! `result` event carries the consolidated answer. The conversation key is
//! a top-level `session_id`, which may appear on several event kinds;
//! the last one observed wins.

use crate::process::{run_command, Captured, ExitKind, StdoutLineFn};
use crate::text::{looks_like_json, push_deduped};
use crate::{Activity, AdapterFailure, ProgressEvent, ProgressFn, RunOutcome, RunRequest, ToolAdapter};
use async_trait::async_trait;
use serde_json::Value;
use tether_core::{ErrorCode, Tool};

pub struct ClaudeAdapter {
    pub program: String,
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self { program: "claude".to_string() }
    }
}

impl ClaudeAdapter {
    pub(crate) fn build_argv(&self, req: &RunRequest) -> Vec<String> {
        let mut argv: Vec<String> = [
            "-p",
            "--dangerously-skip-permissions",
            "--verbose",
            "--output-format",
            "stream-json",
        ]
        .map(String::from)
        .to_vec();
        if let Some(key) = &req.resume_key {
            argv.push("-r".to_string());
            argv.push(key.clone());
        }
        argv.extend(req.extra_args.iter().cloned());
        argv.push(req.prompt.clone());
        argv
    }

    pub(crate) fn classify(captured: Captured, timeout_secs: u64) -> RunOutcome {
        let mut chunks: Vec<String> = Vec::new();
        let mut final_text: Option<String> = None;
        let mut session_id: Option<String> = None;
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
                Some("assistant") => {
                    for block in content_blocks(&value) {
                        if block.get("type").and_then(Value::as_str) == Some("text") {
                            if let Some(text) = block.get("text").and_then(Value::as_str) {
                                push_deduped(&mut chunks, text);
                            }
                        }
                    }
                }
                Some("result") => {
                    if let Some(result) = value.get("result").and_then(Value::as_str) {
                        final_text = Some(result.to_string());
                    }
                }
                _ => {}
            }
        }

        let assistant_text = final_text.unwrap_or_else(|| chunks.join("\n"));
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
                exit_message(code, &captured.stderr_lines),
            )),
            ExitKind::Exited(_) => {
                if parsed == 0 && parse_failures > 0 {
                    Some(AdapterFailure::new(
                        ErrorCode::AdapterParse,
                        "no parsable events in tool output",
                    ))
                } else if session_id.is_none() {
                    Some(AdapterFailure::new(
                        ErrorCode::AdapterSessionKeyMissing,
                        "tool finished without reporting a session_id",
                    ))
                } else {
                    None
                }
            }
        };

        RunOutcome {
            ok: error.is_none(),
            assistant_text,
            adapter_state,
            diagnostics,
            stdout_lines: captured.stdout_lines,
            stderr_lines: captured.stderr_lines,
            error,
        }
    }
}

/// Streaming pass: surface text, tool use, and thinking as they happen.
fn emit_stream(line: &str, progress: &Option<ProgressFn>) {
    let Some(progress) = progress else { return };
    if !looks_like_json(line) {
        return;
    }
    let Ok(value) = serde_json::from_str::<Value>(line) else { return };
    if value.get("type").and_then(Value::as_str) != Some("assistant") {
        return;
    }
    for block in content_blocks(&value) {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    if !text.is_empty() {
                        progress(ProgressEvent::AssistantText { text: text.to_string() });
                    }
                }
            }
            Some("tool_use") => {
                let label = block
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .unwrap_or("tool");
                progress(ProgressEvent::Activity {
                    activity: Activity::Tool,
                    label: label.to_string(),
                });
            }
            Some("thinking") => {
                progress(ProgressEvent::Activity {
                    activity: Activity::Thinking,
                    label: "thinking".to_string(),
                });
            }
            _ => {}
        }
    }
}

fn content_blocks(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)
        .map(|blocks| blocks.iter())
        .into_iter()
        .flatten()
}

fn exit_message(code: i32, stderr_lines: &[String]) -> String {
    match stderr_lines.last() {
        Some(last) if !last.is_empty() => format!("exit status {code}: {last}"),
        _ => format!("exit status {code}"),
    }
}

#[async_trait]
impl ToolAdapter for ClaudeAdapter {
    fn tool(&self) -> Tool {
        Tool::Claude
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
#[path = "claude_tests.rs"]
mod tests;

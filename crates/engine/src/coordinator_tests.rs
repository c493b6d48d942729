// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end run-loop scenarios over fake adapters.

use super::*;
use crate::hooks::HookResult;
use crate::test_helpers::*;
use tether_adapters::RunOutcome;
use tokio::sync::Semaphore;

#[tokio::test]
async fn jobs_in_one_thread_run_in_enqueue_order() {
    let ctx = setup();
    ctx.engine.start_session("T", "acme", None).unwrap();
    ctx.engine.enqueue("T", "m1", "first").unwrap();
    ctx.engine.enqueue("T", "m2", "second").unwrap();
    ctx.engine.enqueue("T", "m3", "third").unwrap();

    ctx.engine.wait_for_idle().await;

    assert_eq!(ctx.claude.prompts(), ["first", "second", "third"]);

    let state = ctx.engine.state_snapshot();
    let session = &state.sessions["T"];
    assert!(session.running_job_id.is_none());
    assert!(session.queue.is_empty());
    assert_eq!(state.jobs.values().filter(|j| j.state == JobState::Success).count(), 3);

    let third = state.jobs.values().find(|j| j.prompt == "third").unwrap();
    assert_eq!(session.last_job_id.as_ref(), Some(&third.job_id));
    assert_eq!(session.adapter_state["session_id"], "key-claude");
}

#[tokio::test]
async fn global_cap_bounds_concurrent_runs() {
    let ctx = setup_with(|t| FakeAdapter::new(t).with_delay(Duration::from_millis(20)));
    for thread in ["t-a", "t-b", "t-c"] {
        ctx.engine.start_session(thread, "acme", None).unwrap();
        ctx.engine.enqueue(thread, "m1", thread).unwrap();
    }

    ctx.engine.wait_for_idle().await;

    let max = ctx.claude.max_in_flight.load(std::sync::atomic::Ordering::SeqCst);
    assert!(max <= 2, "observed {max} concurrent runs");

    let state = ctx.engine.state_snapshot();
    assert_eq!(state.jobs.values().filter(|j| j.state == JobState::Success).count(), 3);
}

#[tokio::test]
async fn tool_switch_applies_only_to_later_enqueues() {
    let ctx = setup();
    ctx.engine.start_session("T", "acme", None).unwrap();
    ctx.engine.enqueue("T", "m1", "for-claude").unwrap();
    ctx.engine.switch_tool("T", Tool::Codex).unwrap();
    ctx.engine.enqueue("T", "m2", "for-codex").unwrap();

    ctx.engine.wait_for_idle().await;

    assert_eq!(ctx.claude.prompts(), ["for-claude"]);
    assert_eq!(ctx.codex.prompts(), ["for-codex"]);
    assert!(ctx.cursor.prompts().is_empty());

    // Each tool's resume key landed in its own namespace.
    let state = ctx.engine.state_snapshot();
    let session = &state.sessions["T"];
    assert_eq!(session.adapter_state["session_id"], "key-claude");
    assert_eq!(session.adapter_state["thread_id"], "key-codex");
}

#[tokio::test]
async fn duplicate_message_id_is_enqueued_once() {
    let ctx = setup();
    ctx.engine.start_session("T", "acme", None).unwrap();

    let first = ctx.engine.enqueue("T", "m1", "only once").unwrap();
    let second = ctx.engine.enqueue("T", "m1", "only once").unwrap();

    assert!(!first.deduped);
    assert!(second.deduped);
    assert_eq!(first.job_id, second.job_id);

    ctx.engine.wait_for_idle().await;

    assert_eq!(ctx.claude.prompts(), ["only once"]);
    let state = ctx.engine.state_snapshot();
    let owners: Vec<_> =
        state.jobs.values().filter(|j| j.discord_message_id == "m1").collect();
    assert_eq!(owners.len(), 1);
}

#[tokio::test]
async fn queue_admits_twenty_then_refuses() {
    let gate = Arc::new(Semaphore::new(0));
    let ctx = {
        let gate = Arc::clone(&gate);
        setup_with(move |t| FakeAdapter::new(t).with_gate(Arc::clone(&gate)))
    };
    ctx.engine.start_session("T", "acme", None).unwrap();

    // First job starts running (blocked on the gate), leaving the queue empty.
    ctx.engine.enqueue("T", "m0", "running").unwrap();
    wait_until(&ctx.engine, |s| s.sessions["T"].running_job_id.is_some()).await;

    for i in 1..=20 {
        ctx.engine.enqueue("T", &format!("m{i}"), "queued").unwrap();
    }
    let err = ctx.engine.enqueue("T", "m21", "one too many").unwrap_err();
    assert_eq!(domain_code(err), ErrorCode::QueueFull);

    gate.add_permits(21);
    ctx.engine.wait_for_idle().await;

    let state = ctx.engine.state_snapshot();
    assert_eq!(state.jobs.values().filter(|j| j.state == JobState::Success).count(), 21);
}

#[tokio::test]
async fn failed_job_surfaces_code_and_retry_creates_fresh_attempt() {
    let ctx = setup_with(|t| {
        FakeAdapter::new(t)
            .with_response(|_| failed_outcome(ErrorCode::CliExitNonzero, "exit status 2"))
    });
    ctx.engine.start_session("T", "acme", None).unwrap();
    let first = ctx.engine.enqueue("T", "m1", "doomed").unwrap();
    ctx.engine.wait_for_idle().await;

    let status = ctx.engine.session_status("T").unwrap();
    assert!(status.retry_hint);
    let last = status.last_job.unwrap();
    assert_eq!(last.state, JobState::Failed);
    assert_eq!(last.error_code, Some(ErrorCode::CliExitNonzero));

    let retried = ctx.engine.retry("T").unwrap();
    assert_ne!(retried.job_id, first.job_id);
    ctx.engine.wait_for_idle().await;

    let state = ctx.engine.state_snapshot();
    let retry_job = &state.jobs[&retried.job_id];
    assert_eq!(retry_job.attempt, 2);
    assert_eq!(retry_job.prompt, "doomed");
    assert!(retry_job
        .discord_message_id
        .starts_with(&format!("retry:{}:", first.job_id)));
    // The original job is untouched by the retry.
    assert_eq!(state.jobs[&first.job_id].state, JobState::Failed);
}

#[tokio::test]
async fn resume_key_is_injected_on_the_next_run() {
    let ctx = setup();
    ctx.engine.start_session("T", "acme", None).unwrap();
    ctx.engine.enqueue("T", "m1", "one").unwrap();
    ctx.engine.wait_for_idle().await;
    ctx.engine.enqueue("T", "m2", "two").unwrap();
    ctx.engine.wait_for_idle().await;

    let calls = ctx.claude.calls.lock();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].resume_key, None);
    assert_eq!(calls[1].resume_key.as_deref(), Some("key-claude"));
}

#[tokio::test]
async fn project_default_args_reach_the_adapter() {
    let ctx = setup();
    ctx.engine
        .create_project(crate::commands::NewProject {
            name: "tuned".into(),
            path: ctx.project_dir.clone(),
            enabled_tools: vec![Tool::Claude],
            default_tool: None,
            default_args: std::collections::HashMap::from([(
                Tool::Claude,
                vec!["--model".to_string(), "opus".to_string()],
            )]),
        })
        .unwrap();
    ctx.engine.start_session("T", "tuned", None).unwrap();
    ctx.engine.enqueue("T", "m1", "go").unwrap();
    ctx.engine.wait_for_idle().await;

    let calls = ctx.claude.calls.lock();
    assert_eq!(calls[0].extra_args, ["--model", "opus"]);
}

struct RecordingHooks {
    events: parking_lot::Mutex<Vec<String>>,
    fail_progress: bool,
}

impl EngineHooks for RecordingHooks {
    fn on_job_started(&self, info: &JobStartedInfo) -> HookResult {
        self.events.lock().push(format!("started:{}", info.prompt));
        Ok(())
    }

    fn on_job_progress(
        &self,
        _thread_id: &str,
        _job_id: &JobId,
        event: &ProgressEvent,
    ) -> HookResult {
        if let ProgressEvent::AssistantText { text } = event {
            self.events.lock().push(format!("progress:{text}"));
        }
        if self.fail_progress {
            Err("chat surface unreachable".into())
        } else {
            Ok(())
        }
    }

    fn on_job_finished(&self, info: &JobFinishedInfo) -> HookResult {
        self.events.lock().push(format!("finished:{}", info.state));
        Ok(())
    }
}

#[tokio::test]
async fn hooks_fire_in_lifecycle_order() {
    let ctx = setup();
    let hooks = Arc::new(RecordingHooks { events: parking_lot::Mutex::new(Vec::new()), fail_progress: false });
    ctx.engine.set_hooks(Arc::clone(&hooks) as Arc<dyn EngineHooks>);
    ctx.engine.start_session("T", "acme", None).unwrap();
    ctx.engine.enqueue("T", "m1", "p").unwrap();
    ctx.engine.wait_for_idle().await;

    // The finished hook fires just after the completion event; give it a tick.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = hooks.events.lock().clone();
    assert_eq!(events, ["started:p", "progress:working:p", "finished:success"]);
}

#[tokio::test]
async fn failing_progress_hook_does_not_fail_the_job() {
    let ctx = setup();
    let hooks = Arc::new(RecordingHooks { events: parking_lot::Mutex::new(Vec::new()), fail_progress: true });
    ctx.engine.set_hooks(hooks as Arc<dyn EngineHooks>);
    ctx.engine.start_session("T", "acme", None).unwrap();
    ctx.engine.enqueue("T", "m1", "p").unwrap();
    ctx.engine.wait_for_idle().await;

    let state = ctx.engine.state_snapshot();
    assert_eq!(state.jobs.values().next().unwrap().state, JobState::Success);
}

#[tokio::test]
async fn job_log_file_captures_all_streams() {
    let ctx = setup_with(|t| {
        FakeAdapter::new(t).with_response(|req| RunOutcome {
            ok: true,
            assistant_text: format!("done:{}", req.prompt),
            stdout_lines: vec![r#"{"type":"result"}"#.to_string(), "plain".to_string()],
            stderr_lines: vec!["warn".to_string()],
            diagnostics: vec!["plain".to_string()],
            ..RunOutcome::default()
        })
    });
    ctx.engine.start_session("T", "acme", None).unwrap();
    let receipt = ctx.engine.enqueue("T", "m1", "p").unwrap();
    ctx.engine.wait_for_idle().await;

    // Log write happens before the completion event, so it's on disk now.
    let path = ctx.state_dir.join("logs/job").join(format!("{}.log", receipt.job_id));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[stdout] {\"type\":\"result\"}"));
    assert!(text.contains("[stderr] warn"));
    assert!(text.contains("[diagnostic] plain"));
}

#[tokio::test]
async fn notify_new_work_is_idempotent_under_spam() {
    let ctx = setup();
    ctx.engine.start_session("T", "acme", None).unwrap();
    ctx.engine.enqueue("T", "m1", "only").unwrap();
    for _ in 0..50 {
        ctx.engine.notify_new_work();
    }
    ctx.engine.wait_for_idle().await;

    assert_eq!(ctx.claude.prompts(), ["only"]);
}

#[tokio::test]
async fn excerpt_is_truncated_to_limit() {
    let long = "x".repeat(1000);
    let ctx = setup_with(move |t| {
        let long = long.clone();
        FakeAdapter::new(t).with_response(move |_| RunOutcome {
            ok: true,
            assistant_text: long.clone(),
            ..RunOutcome::default()
        })
    });
    ctx.engine.start_session("T", "acme", None).unwrap();
    let receipt = ctx.engine.enqueue("T", "m1", "p").unwrap();
    ctx.engine.wait_for_idle().await;

    let state = ctx.engine.state_snapshot();
    let excerpt = state.jobs[&receipt.job_id].result_excerpt.clone().unwrap();
    assert_eq!(excerpt.chars().count(), 400);
}

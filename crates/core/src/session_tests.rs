// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

fn session() -> Session {
    Session::new("thread-1", "acme", Tool::Claude, HashMap::new(), Utc::now())
}

#[test]
fn new_session_is_idle() {
    let s = session();
    assert!(s.queue.is_empty());
    assert!(s.running_job_id.is_none());
    assert!(s.last_job_id.is_none());
    assert_eq!(s.created_at, s.last_activity_at);
}

#[test]
fn resume_key_is_per_tool_namespace() {
    let mut s = session();
    s.adapter_state.insert("session_id".into(), "sk-1".into());
    s.adapter_state.insert("thread_id".into(), "tk-1".into());

    assert_eq!(s.resume_key(Tool::Claude), Some("sk-1"));
    assert_eq!(s.resume_key(Tool::Cursor), Some("sk-1"));
    assert_eq!(s.resume_key(Tool::Codex), Some("tk-1"));
}

#[test]
fn empty_resume_key_means_no_resume() {
    let mut s = session();
    s.adapter_state.insert("session_id".into(), String::new());
    assert_eq!(s.resume_key(Tool::Claude), None);
    assert_eq!(s.resume_key(Tool::Codex), None);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::commands::NewProject;
use crate::coordinator::{Engine, EngineConfig, OpError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_adapters::{AdapterFailure, ProgressEvent, RunOutcome, RunRequest, ToolAdapter};
use tether_core::{ErrorCode, FakeClock, Tool};
use tether_storage::RuntimeState;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub resume_key: Option<String>,
    pub extra_args: Vec<String>,
}

type ResponseFn = dyn Fn(&RunRequest) -> RunOutcome + Send + Sync;

/// Scriptable in-memory adapter that records every invocation.
pub struct FakeAdapter {
    tool: Tool,
    pub calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    delay: Duration,
    gate: Option<Arc<tokio::sync::Semaphore>>,
    response: Box<ResponseFn>,
}

impl FakeAdapter {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
            gate: None,
            response: Box::new(move |req| ok_outcome(tool, req)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Each run consumes one gate permit before finishing; tests release
    /// jobs by adding permits.
    pub fn with_gate(mut self, gate: Arc<tokio::sync::Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_response(
        mut self,
        response: impl Fn(&RunRequest) -> RunOutcome + Send + Sync + 'static,
    ) -> Self {
        self.response = Box::new(response);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.prompt.clone()).collect()
    }
}

pub fn ok_outcome(tool: Tool, req: &RunRequest) -> RunOutcome {
    RunOutcome {
        ok: true,
        assistant_text: format!("done:{}", req.prompt),
        adapter_state: HashMap::from([(
            tool.resume_key_field().to_string(),
            format!("key-{tool}"),
        )]),
        ..Default::default()
    }
}

pub fn failed_outcome(code: ErrorCode, message: &str) -> RunOutcome {
    RunOutcome {
        ok: false,
        error: Some(AdapterFailure::new(code, message)),
        ..Default::default()
    }
}

#[async_trait]
impl ToolAdapter for FakeAdapter {
    fn tool(&self) -> Tool {
        self.tool
    }

    async fn run(&self, req: RunRequest) -> RunOutcome {
        self.calls.lock().push(RecordedCall {
            prompt: req.prompt.clone(),
            resume_key: req.resume_key.clone(),
            extra_args: req.extra_args.clone(),
        });
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => {}
            }
        }
        if let Some(progress) = &req.progress {
            progress(ProgressEvent::AssistantText { text: format!("working:{}", req.prompt) });
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.response)(&req)
    }
}

pub struct TestCtx {
    pub engine: Engine<FakeClock>,
    pub clock: FakeClock,
    pub claude: Arc<FakeAdapter>,
    pub codex: Arc<FakeAdapter>,
    pub cursor: Arc<FakeAdapter>,
    pub state_dir: PathBuf,
    pub project_dir: PathBuf,
    // Held for the temp dir lifetime.
    _dir: tempfile::TempDir,
}

pub fn setup() -> TestCtx {
    setup_with(FakeAdapter::new)
}

/// Fresh engine over a temp state dir with one project ("acme", all tools,
/// claude default) and fake adapters built by `make`.
pub fn setup_with(make: impl Fn(Tool) -> FakeAdapter) -> TestCtx {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("proj");
    std::fs::create_dir_all(&project_dir).unwrap();
    let state_dir = dir.path().join("state");

    let claude = Arc::new(make(Tool::Claude));
    let codex = Arc::new(make(Tool::Codex));
    let cursor = Arc::new(make(Tool::Cursor));
    let adapters: HashMap<Tool, Arc<dyn ToolAdapter>> = HashMap::from([
        (Tool::Claude, Arc::clone(&claude) as Arc<dyn ToolAdapter>),
        (Tool::Codex, Arc::clone(&codex) as Arc<dyn ToolAdapter>),
        (Tool::Cursor, Arc::clone(&cursor) as Arc<dyn ToolAdapter>),
    ]);

    let clock = FakeClock::new();
    let engine = Engine::open(
        EngineConfig { state_dir: state_dir.clone(), owner_id: "owner-1".into() },
        adapters,
        clock.clone(),
    )
    .unwrap();
    engine
        .create_project(NewProject {
            name: "acme".into(),
            path: project_dir.clone(),
            enabled_tools: vec![Tool::Claude, Tool::Codex, Tool::Cursor],
            default_tool: Some(Tool::Claude),
            default_args: HashMap::new(),
        })
        .unwrap();

    TestCtx { engine, clock, claude, codex, cursor, state_dir, project_dir, _dir: dir }
}

/// Poll the projection until `pred` holds or a generous deadline passes.
pub async fn wait_until(engine: &Engine<FakeClock>, pred: impl Fn(&RuntimeState) -> bool) {
    for _ in 0..1000 {
        if pred(&engine.state_snapshot()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Unwrap the stable code from a domain error.
pub fn domain_code(err: OpError) -> ErrorCode {
    match err {
        OpError::Domain(e) => e.code,
        other => panic!("expected domain error, got: {other}"),
    }
}

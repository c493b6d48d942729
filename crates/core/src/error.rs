// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable error codes surfaced to the operator.
//!
//! Every user-visible failure carries exactly one of these codes. The code
//! strings are part of the persisted format (`job:failed` events store them),
//! so variants are renamed, never removed.

use serde::{Deserialize, Serialize};

/// Closed set of stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // ownership
    #[serde(rename = "E_OWNER_ONLY")]
    OwnerOnly,

    // routing
    #[serde(rename = "E_NOT_IN_MANAGED_THREAD")]
    NotInManagedThread,
    #[serde(rename = "E_SESSION_NOT_FOUND")]
    SessionNotFound,
    #[serde(rename = "E_THREAD_ACCESS_FAILED")]
    ThreadAccessFailed,

    // project / tool configuration
    #[serde(rename = "E_PROJECT_NOT_FOUND")]
    ProjectNotFound,
    #[serde(rename = "E_PROJECT_EXISTS")]
    ProjectExists,
    #[serde(rename = "E_INVALID_PATH")]
    InvalidPath,
    #[serde(rename = "E_INVALID_PROJECT_NAME")]
    InvalidProjectName,
    #[serde(rename = "E_INVALID_TOOLSET")]
    InvalidToolset,
    #[serde(rename = "E_TOOL_NOT_ENABLED")]
    ToolNotEnabled,

    // scheduling
    #[serde(rename = "E_QUEUE_FULL")]
    QueueFull,
    #[serde(rename = "E_JOB_NOT_RETRYABLE")]
    JobNotRetryable,

    // adapter runtime
    #[serde(rename = "E_CLI_TIMEOUT")]
    CliTimeout,
    #[serde(rename = "E_CLI_EXIT_NONZERO")]
    CliExitNonzero,
    #[serde(rename = "E_ADAPTER_PARSE")]
    AdapterParse,
    #[serde(rename = "E_ADAPTER_MISSING_RESULT")]
    AdapterMissingResult,
    #[serde(rename = "E_ADAPTER_SESSION_KEY_MISSING")]
    AdapterSessionKeyMissing,

    // transport
    #[serde(rename = "E_DISCORD_RATE_LIMIT")]
    DiscordRateLimit,
}

crate::simple_display! {
    ErrorCode {
        OwnerOnly => "E_OWNER_ONLY",
        NotInManagedThread => "E_NOT_IN_MANAGED_THREAD",
        SessionNotFound => "E_SESSION_NOT_FOUND",
        ThreadAccessFailed => "E_THREAD_ACCESS_FAILED",
        ProjectNotFound => "E_PROJECT_NOT_FOUND",
        ProjectExists => "E_PROJECT_EXISTS",
        InvalidPath => "E_INVALID_PATH",
        InvalidProjectName => "E_INVALID_PROJECT_NAME",
        InvalidToolset => "E_INVALID_TOOLSET",
        ToolNotEnabled => "E_TOOL_NOT_ENABLED",
        QueueFull => "E_QUEUE_FULL",
        JobNotRetryable => "E_JOB_NOT_RETRYABLE",
        CliTimeout => "E_CLI_TIMEOUT",
        CliExitNonzero => "E_CLI_EXIT_NONZERO",
        AdapterParse => "E_ADAPTER_PARSE",
        AdapterMissingResult => "E_ADAPTER_MISSING_RESULT",
        AdapterSessionKeyMissing => "E_ADAPTER_SESSION_KEY_MISSING",
        DiscordRateLimit => "E_DISCORD_RATE_LIMIT",
    }
}

/// A domain error: stable code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

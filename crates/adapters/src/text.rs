// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared text handling for the stream parsers.

use serde_json::Value;

/// Cheap check that a line is worth handing to the JSON parser.
pub fn looks_like_json(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// Append a chunk unless it repeats the previous one.
///
/// Some tools emit both a streaming delta and a final consolidated copy of
/// the same text; document order with consecutive duplicates dropped keeps
/// exactly one.
pub fn push_deduped(chunks: &mut Vec<String>, text: &str) {
    if text.is_empty() {
        return;
    }
    if chunks.last().map(String::as_str) == Some(text) {
        return;
    }
    chunks.push(text.to_string());
}

/// Best-effort text extraction from a loosely shaped event.
///
/// Checks the conventional keys in order, recursing one level into nested
/// objects so `{"message": {"text": "hi"}}` resolves.
pub fn extract_text(value: &Value) -> Option<String> {
    const KEYS: [&str; 5] = ["text", "content", "message", "response", "delta"];
    for key in KEYS {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(nested @ Value::Object(_)) => {
                if let Some(found) = extract_text(nested) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// Does combined tool output smell like a transient infrastructure failure?
pub fn has_transient_hint(combined: &str) -> bool {
    const HINTS: [&str; 5] = ["quota", "retry", "rate limit", "429", "temporarily unavailable"];
    let lowered = combined.to_lowercase();
    HINTS.iter().any(|hint| lowered.contains(hint))
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;

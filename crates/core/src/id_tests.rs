// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_ids_are_prefixed_and_unique() {
    let a = JobId::generate();
    let b = JobId::generate();

    assert!(a.as_str().starts_with("job-"));
    assert_eq!(a.as_str().len(), 23);
    assert_ne!(a, b);
}

#[test]
fn short_truncates_on_char_boundaries() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
    assert_eq!(short("héllo", 2), "hé");
    assert_eq!(short("ééé", 0), "");
}

#[test]
fn serializes_as_plain_string() {
    let id = JobId::new("job-x1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"job-x1\"");

    let back: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readers see the previous contents (via `.bak`) or the full new
//! contents, never a half-rendered file.

use nova_storage::{atomic_write_json, read_json_or_bak};
use serde_json::json;

#[test]
fn torn_primary_recovers_from_bak() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missions.json");

    atomic_write_json(&path, &json!({"version": 1, "missions": ["m1"]})).unwrap();
    atomic_write_json(&path, &json!({"version": 1, "missions": ["m1", "m2"]})).unwrap();

    // Simulate a crash that tore the primary mid-write.
    std::fs::write(&path, b"{\"version\": 1, \"missio").unwrap();

    let recovered: Option<serde_json::Value> = read_json_or_bak(&path).unwrap();
    let recovered = recovered.unwrap();
    assert_eq!(recovered["missions"].as_array().unwrap().len(), 1);
}

#[test]
fn repeated_overwrites_always_parse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    for i in 0..20 {
        atomic_write_json(&path, &json!({"iteration": i, "payload": "x".repeat(256)})).unwrap();
        let read: Option<serde_json::Value> = read_json_or_bak(&path).unwrap();
        assert_eq!(read.unwrap()["iteration"], i);
    }
}

#[test]
fn missing_store_reads_as_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-written.json");
    let read: Option<serde_json::Value> = read_json_or_bak(&path).unwrap();
    assert!(read.is_none());
}

#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use nucleo_core::{
    ledger::{Ledger, LedgerOptions},
    storage::{JsonFileStore, MemoryStore},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a unique directory that outlives the calling test.
pub fn test_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Ledger over a shared in-memory store, already initialized with the seed data.
pub fn memory_ledger() -> (Ledger, MemoryStore) {
    memory_ledger_with(LedgerOptions::default())
}

pub fn memory_ledger_with(options: LedgerOptions) -> (Ledger, MemoryStore) {
    let store = MemoryStore::new();
    let ledger = Ledger::new(Box::new(store.clone()), options).expect("create ledger");
    ledger.initialize();
    (ledger, store)
}

/// Ledger over a JSON file inside a fresh test directory. Not initialized.
pub fn json_ledger() -> (Ledger, PathBuf) {
    let path = test_dir().join("ledger.json");
    (open_json_ledger(&path), path)
}

pub fn open_json_ledger(path: &std::path::Path) -> Ledger {
    let store = JsonFileStore::new(path.to_path_buf(), Some(3)).expect("create json store");
    Ledger::new(Box::new(store), LedgerOptions::default()).expect("create ledger")
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

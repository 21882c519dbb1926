#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vecdoc_refresh::engine::memory::{FakeDocument, MemoryEngine};

/// A temp folder holding empty placeholder files with the given names.
pub fn folder_with(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in names {
        std::fs::write(dir.path().join(name), b"").expect("write fixture");
    }
    dir
}

/// An engine that knows one fake document per (file name, document) pair in `dir`.
pub fn engine_for(dir: &Path, docs: Vec<(&str, FakeDocument)>) -> MemoryEngine {
    let engine = MemoryEngine::new();
    for (name, doc) in docs {
        engine.insert(dir.join(name), doc);
    }
    engine
}

pub fn path_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

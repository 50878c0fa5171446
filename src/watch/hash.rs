// src/watch/hash.rs

//! Content hashing for watch rules (blake3).

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hex blake3 digest of one file, streamed.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening {} for hashing", path.display()))?;
    let mut hasher = Hasher::new();
    io::copy(&mut reader, &mut hasher).with_context(|| format!("hashing {}", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Digest over per-file digests. Callers pass them in path order.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for hash in hashes {
        hasher.update(hash.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Per-file digests, reused until a watch event names the file.
#[derive(Debug, Default)]
pub struct FileHashes {
    by_path: HashMap<PathBuf, String>,
}

impl FileHashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<String> {
        if let Some(hash) = self.by_path.get(path) {
            return Ok(hash.clone());
        }
        let hash = compute_file_hash(fs, path)?;
        self.by_path.insert(path.to_path_buf(), hash.clone());
        Ok(hash)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.by_path.remove(path);
    }
}

/// Last aggregate digest per watch rule, in memory only.
#[derive(Debug, Default)]
pub struct HashStore {
    by_rule: HashMap<String, String>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, rule: &str) -> Option<&str> {
        self.by_rule.get(rule).map(String::as_str)
    }

    /// Record `hash` for `rule`. `false` means nothing changed.
    pub fn update(&mut self, rule: &str, hash: String) -> bool {
        if self.load(rule) == Some(hash.as_str()) {
            return false;
        }
        debug!(rule, %hash, "rule hash changed");
        self.by_rule.insert(rule.to_string(), hash);
        true
    }
}

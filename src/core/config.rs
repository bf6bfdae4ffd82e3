use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,

    // Read side
    pub term_cache_size: usize,     // LRU entries per token cursor
    pub use_mmap: bool,             // Map stores instead of reading them into memory

    // Query side
    pub max_rewrite_passes: usize,  // Fixed-point guard for the rewrite driver
    pub max_query_depth: usize,
    pub max_clauses: usize,         // Per combinator node
    pub max_expanded_terms: usize,  // Prefix / wildcard / regexp expansion cap
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            term_cache_size: 1024,
            use_mmap: true,
            max_rewrite_passes: 64,
            max_query_depth: 32,
            max_clauses: 1024,
            max_expanded_terms: 1024,
        }
    }
}

impl Config {
    /// Parse a JSON document; missing keys fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

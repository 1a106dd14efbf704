//! Resumable-cursor cache.
//!
//! Persists the byte offset already processed together with the cumulative
//! aggregation state, so a later run re-scans only appended bytes. The
//! payload is an internal JSON contract between `save` and `load`; anything
//! unreadable or schema-mismatched degrades to a cold start, never an
//! error.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{DigestError, ErrorRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheState {
    /// File size at the end of the run that wrote this cache. Assumes an
    /// append-only log; shrinkage is handled by the caller's truncation
    /// policy.
    pub offset: u64,
    /// Dedup key → record.
    pub records: HashMap<String, ErrorRecord>,
    /// Lowercased type name → display slug.
    pub type_registry: BTreeMap<String, String>,
    /// Lowercased type name → distinct-record count.
    pub type_counts: BTreeMap<String, u64>,
}

impl CacheState {
    pub fn empty() -> Self {
        Self {
            offset: 0,
            records: HashMap::new(),
            type_registry: BTreeMap::new(),
            type_counts: BTreeMap::new(),
        }
    }
}

/// Load a previously saved state. `None` means cold start: no cache file,
/// or one we could not make sense of.
pub fn load(path: &Path) -> Option<CacheState> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "cache unreadable, starting cold");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(state) => {
            tracing::debug!(path = %path.display(), "cache restored");
            Some(state)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "cache corrupt, starting cold");
            None
        }
    }
}

pub fn save(path: &Path, state: &CacheState) -> Result<(), DigestError> {
    let payload = serde_json::to_string(state)?;
    fs::write(path, payload).map_err(|source| DigestError::CacheWrite {
        path: path.to_path_buf(),
        source,
    })
}

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One physical line of the log, with the byte offset of its first byte.
///
/// Produced by [`crate::cursor::LineCursor`]; the trailing line terminator
/// (`\n` or `\r\n`) is already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub offset: u64,
}

/// Fields extracted from a header line: `[<timestamp>] PHP <type>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    /// `None` when the bracketed timestamp did not parse; the header still
    /// counts toward aggregation.
    pub timestamp: Option<DateTime<Utc>>,
    pub error_type: String,
    pub message: String,
}

/// A message split around its trailing location suffix
/// (` in <path> on line <n>` or ` in <path>:<n>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSplit {
    /// Message text with the whole suffix removed.
    pub core: String,
    pub path: String,
    pub line: u32,
}

/// The aggregation unit: one record per distinct error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Original-case error type from the first occurrence (e.g. "Fatal error").
    pub error_type: String,
    /// Full message text as logged by the first occurrence.
    pub message: String,
    /// Message with the location suffix stripped; set only when a suffix was found.
    pub core_message: Option<String>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub hits: u64,
    /// Attached stack-trace block, when one followed an occurrence.
    pub trace: Option<String>,
    /// Free-form continuation lines that followed an occurrence.
    pub context: Option<String>,
    pub source_path: Option<String>,
    pub source_line: Option<u32>,
    /// Short window of the referenced source file around `source_line`.
    pub excerpt: Option<String>,
}

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("cannot open log file {path}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log file shrank below cached offset ({size} < {cached} bytes); refusing to resume")]
    Truncated { cached: u64, size: u64 },

    #[error("I/O error while reading log: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode cache payload: {0}")]
    CacheEncode(#[from] serde_json::Error),

    #[error("cannot write cache file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

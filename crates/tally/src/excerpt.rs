//! Source-excerpt enrichment.
//!
//! When a new record carries a source location, the aggregator asks this
//! collaborator for a short window of the referenced file around the named
//! line. Every failure mode is non-fatal: an unreadable file simply leaves
//! the record without an excerpt.

use std::fs::File;
use std::io::{BufRead, BufReader};

pub trait ExcerptReader {
    /// A short excerpt of `path` centered near 1-based `line`, or `None`
    /// if the file cannot be read.
    fn read_excerpt(&self, path: &str, line: u32) -> Option<String>;
}

/// Reads excerpts straight from the filesystem.
pub struct FileExcerptReader {
    /// Number of lines per excerpt window.
    pub window: usize,
}

impl Default for FileExcerptReader {
    fn default() -> Self {
        Self {
            window: crate::DEFAULT_EXCERPT_LINES,
        }
    }
}

impl ExcerptReader for FileExcerptReader {
    fn read_excerpt(&self, path: &str, line: u32) -> Option<String> {
        // Stream-wrapper locations point at plain files underneath.
        let path = path.strip_prefix("zend.view://").unwrap_or(path);
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!(path, %err, "source file unreadable, skipping excerpt");
                return None;
            }
        };
        // Window starts three lines above the named line, clamped at the
        // top of the file.
        let skip = (line as usize).saturating_sub(4);
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .skip(skip)
            .take(self.window)
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

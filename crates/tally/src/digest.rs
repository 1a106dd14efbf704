//! The run pipeline: restore cache → seek → parse → aggregate → persist.
//!
//! One bounded pass over `[cached offset, file size)`. The returned
//! [`CacheState`] is the cumulative aggregation state — exactly what gets
//! persisted, and what a downstream presentation layer renders from
//! (ordering over the record map is the caller's concern).

use crate::aggregate::Aggregator;
use crate::cache::{self, CacheState};
use crate::config::{TallyConfig, TruncationPolicy};
use crate::cursor::LineCursor;
use crate::engine::ParseEngine;
use crate::excerpt::FileExcerptReader;
use crate::model::DigestError;

pub fn run(config: &TallyConfig) -> Result<CacheState, DigestError> {
    let mut cursor = LineCursor::open(&config.log_path)?;
    let size = cursor.size_bytes();

    let mut state = config
        .cache_path
        .as_deref()
        .and_then(cache::load)
        .unwrap_or_else(CacheState::empty);

    if state.offset > size {
        match config.on_truncation {
            TruncationPolicy::Reset => {
                tracing::warn!(
                    cached = state.offset,
                    size,
                    "log shrank below cached offset, treating as rotated"
                );
                state = CacheState::empty();
            }
            TruncationPolicy::Fail => {
                return Err(DigestError::Truncated {
                    cached: state.offset,
                    size,
                });
            }
        }
    }

    let resume_from = state.offset;
    cursor.seek(resume_from)?;

    let excerpts = FileExcerptReader {
        window: config.excerpt_lines,
    };
    let mut aggregator = Aggregator::from_state(state, Some(Box::new(excerpts)));
    ParseEngine::new(config.trace_header_policy).run(&mut cursor, &mut aggregator)?;

    let state = aggregator.into_state(size);
    tracing::info!(
        log = %config.log_path.display(),
        scanned = size - resume_from,
        records = state.records.len(),
        "digest complete"
    );

    if let Some(path) = &config.cache_path {
        cache::save(path, &state)?;
        tracing::debug!(path = %path.display(), offset = state.offset, "cache saved");
    }

    Ok(state)
}

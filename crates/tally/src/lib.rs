//! Incremental digestion of PHP-style interpreter error logs.
//!
//! Reads the newly appended tail of an error log and folds it into a
//! deduplicated view: one record per distinct message, with first/last-seen
//! timestamps, a hit counter, and any stack-trace or continuation text that
//! followed an occurrence. A persisted cursor makes repeated runs cheap.
//!
//! # Architecture
//!
//! - `cursor.rs`: sequential, seekable line reader — the only file access
//! - `classify.rs`: stateless line-shape predicates and field extractors
//! - `engine.rs`: the parse state machine with deferred attachment
//! - `aggregate.rs`: keyed dedup/merge of records
//! - `excerpt.rs`: source-snippet enrichment collaborator
//! - `cache.rs`: resumable-cursor persistence
//! - `config.rs`: TOML + environment configuration
//! - `digest.rs`: the end-to-end run pipeline

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod config;
pub mod cursor;
pub mod digest;
pub mod engine;
pub mod excerpt;
pub mod model;

pub use aggregate::Aggregator;
pub use cache::CacheState;
pub use config::{ConfigError, TallyConfig, TraceHeaderPolicy, TruncationPolicy};
pub use cursor::LineCursor;
pub use digest::run;
pub use engine::ParseEngine;
pub use excerpt::{ExcerptReader, FileExcerptReader};
pub use model::{DigestError, ErrorRecord, HeaderLine, LocationSplit, LogLine};

/// Lines per source excerpt: the named line, three above, three below.
pub const DEFAULT_EXCERPT_LINES: usize = 7;

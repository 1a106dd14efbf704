//! The line-oriented parse state machine.
//!
//! Drives a [`LineCursor`] over the unread tail of the log and feeds the
//! [`Aggregator`]. Per pass over a line the engine is in one of three
//! implicit states: scanning for the next header, collecting trace frames
//! after an announcement, or absorbing free-form context lines.
//!
//! Attachment of trailing text is deferred: a stack trace or continuation
//! block physically follows the header it belongs to, but the engine only
//! confirms ownership once it has moved past that header looking for the
//! next one. It therefore keeps the dedup key of the record finalized most
//! recently and attaches newly collected trace/context through that key.
//! Text encountered before the first header has no owner and is dropped.

use std::io::{self, Read, Seek};

use crate::aggregate::Aggregator;
use crate::classify;
use crate::config::TraceHeaderPolicy;
use crate::cursor::LineCursor;
use crate::model::HeaderLine;

pub struct ParseEngine {
    policy: TraceHeaderPolicy,
    /// Dedup key of the most recently finalized record. Deferred trace and
    /// context blobs attach through this key.
    last_key: Option<String>,
}

impl ParseEngine {
    pub fn new(policy: TraceHeaderPolicy) -> Self {
        Self {
            policy,
            last_key: None,
        }
    }

    /// Consume the cursor to end of file, folding every finalized line
    /// group into the aggregator.
    pub fn run<R: Read + Seek>(
        &mut self,
        cursor: &mut LineCursor<R>,
        aggregator: &mut Aggregator,
    ) -> io::Result<()> {
        while cursor.current().is_some() {
            self.step(cursor, aggregator)?;
        }
        Ok(())
    }

    /// One pass: optional trace block, optional context block, then at most
    /// one header finalization.
    fn step<R: Read + Seek>(
        &mut self,
        cursor: &mut LineCursor<R>,
        aggregator: &mut Aggregator,
    ) -> io::Result<()> {
        let line = match cursor.current() {
            Some(line) => line.text.clone(),
            None => return Ok(()),
        };

        // Announcement shape wins over the header shape: a header message
        // may itself end with "Stack trace:".
        if classify::is_trace_announcement(&line) {
            let announcement_header = match self.policy {
                TraceHeaderPolicy::Count => announcement_as_header(&line),
                TraceHeaderPolicy::Skip => None,
            };
            cursor.advance()?;
            if let Some(trace) = collect_trace(cursor)? {
                match &self.last_key {
                    Some(key) => aggregator.attach_trace(key, trace),
                    None => tracing::trace!("trace block before first header, dropped"),
                }
            }
            // The announcement header is finalized only after the trace has
            // been attached, so the trace lands on its predecessor.
            if let Some(header) = announcement_header {
                self.last_key = Some(aggregator.merge(header));
            }
        }

        let mut context = Vec::new();
        while let Some(line) = cursor.current() {
            if classify::parse_header(&line.text).is_some() {
                break;
            }
            context.push(line.text.clone());
            cursor.advance()?;
        }
        if !context.is_empty() {
            match &self.last_key {
                Some(key) => aggregator.attach_context(key, context.join("\n")),
                None => tracing::trace!(
                    lines = context.len(),
                    "context before first header, dropped"
                ),
            }
        }

        if let Some(line) = cursor.current() {
            if let Some(header) = classify::parse_header(&line.text) {
                self.last_key = Some(aggregator.merge(header));
            }
            cursor.advance()?;
        }
        Ok(())
    }
}

/// Reread an announcement line as a header of its own, with the trailing
/// "Stack trace:" token stripped from the message. Bare announcement lines
/// (`[ts] PHP Stack trace:`) do not parse as headers and yield `None`.
fn announcement_as_header(line: &str) -> Option<HeaderLine> {
    let mut header = classify::parse_header(line)?;
    header.message = classify::strip_announcement_suffix(&header.message).to_string();
    if header.message.is_empty() {
        return None;
    }
    Some(header)
}

/// Collect consecutive trace-frame lines into one blob. Leaves the cursor
/// on the first line that is not a frame. A `#0`-style trace carries a
/// `thrown in …` terminator on the following line; that line is absorbed
/// too, unless it is already the next header.
fn collect_trace<R: Read + Seek>(cursor: &mut LineCursor<R>) -> io::Result<Option<String>> {
    let mut frames = Vec::new();
    while let Some(line) = cursor.current() {
        match classify::parse_trace_frame(&line.text) {
            Some(frame) => {
                frames.push(frame);
                cursor.advance()?;
            }
            None => break,
        }
    }
    if frames.is_empty() {
        return Ok(None);
    }
    if frames[0].starts_with("#0") {
        if let Some(line) = cursor.current() {
            if classify::parse_header(&line.text).is_none()
                && !classify::is_trace_announcement(&line.text)
            {
                frames.push(line.text.clone());
                cursor.advance()?;
            }
        }
    }
    tracing::trace!(frames = frames.len(), "trace block collected");
    Ok(Some(frames.join("\n")))
}

//! Stateless line classification.
//!
//! Pure predicate and extractor functions applied to one line of text at a
//! time. The recognized shapes:
//!
//! - header:              `[<timestamp>] PHP <type>: <message>`
//! - trace announcement:  any line whose trimmed text ends with `stack trace:`
//! - trace frame:         `[<timestamp>] PHP <n>. <text>` or `#<n> <text>`
//! - location suffix:     trailing ` in <path> on line <n>` / ` in <path>:<n>`
//!
//! A header line's message may itself end with `Stack trace:`, so callers
//! must test the announcement shape before the header shape.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::{HeaderLine, LocationSplit};

const ANNOUNCEMENT: &[u8] = b"stack trace:";

/// Does this line announce a stack-trace block? Case-insensitive, anchored
/// at the (trimmed) end of the line.
pub fn is_trace_announcement(line: &str) -> bool {
    let trimmed = line.trim_end().as_bytes();
    trimmed.len() >= ANNOUNCEMENT.len()
        && trimmed[trimmed.len() - ANNOUNCEMENT.len()..].eq_ignore_ascii_case(ANNOUNCEMENT)
}

/// Parse a header line: `[<timestamp>] PHP <type>: <message>`.
///
/// The type is everything up to the first colon that is followed by
/// whitespace, so messages containing `::` method paths do not split early.
pub fn parse_header(line: &str) -> Option<HeaderLine> {
    let rest = line.strip_prefix('[')?;
    let close = rest.find(']')?;
    let stamp = &rest[..close];
    let rest = rest[close + 1..].strip_prefix(" PHP ")?;

    let bytes = rest.as_bytes();
    let split = bytes.iter().enumerate().position(|(i, &b)| {
        b == b':' && bytes.get(i + 1).is_some_and(|c| c.is_ascii_whitespace())
    })?;

    Some(HeaderLine {
        timestamp: parse_timestamp(stamp),
        error_type: rest[..split].trim().to_string(),
        message: rest[split + 1..].trim().to_string(),
    })
}

/// Extract the frame text from a trace line, in either shape the
/// interpreter writes:
///
/// - `[<ts>] PHP <n>. <text>` — the numbered call list logged before the
///   announcement (yields `<n>. <text>`)
/// - `#<n> <text>` — the thrown-exception frame list (yielded whole)
pub fn parse_trace_frame(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix('[') {
        if let Some(close) = rest.find(']') {
            if let Some(body) = rest[close + 1..].strip_prefix(" PHP") {
                let trimmed = body.trim_start();
                if trimmed.len() < body.len() {
                    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
                    if digits > 0 && trimmed[digits..].starts_with(". ") {
                        return Some(trimmed.to_string());
                    }
                }
            }
        }
        return None;
    }

    let rest = line.strip_prefix('#')?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && rest[digits..].starts_with(' ') {
        return Some(line.to_string());
    }
    None
}

/// Split a trailing location suffix out of a message.
///
/// Matches ` in <path> on line <n>` or ` in <path>:<n>` anchored at the end
/// of the message, where `<path>` starts with `/` or `zend` (stream-wrapper
/// paths such as `zend.view://…`) and contains no spaces or colons. The
/// first ` in ` occurrence whose tail matches wins.
pub fn split_location_suffix(message: &str) -> Option<LocationSplit> {
    for (idx, _) in message.match_indices(" in ") {
        let tail = &message[idx + 4..];
        if !(tail.starts_with('/') || tail.starts_with("zend")) {
            continue;
        }
        let path_len = tail
            .find(|c| c == ' ' || c == ':')
            .unwrap_or(tail.len());
        let (path, after) = tail.split_at(path_len);
        let digits = if let Some(rest) = after.strip_prefix(" on line ") {
            rest
        } else if let Some(rest) = after.strip_prefix(':') {
            rest
        } else {
            continue;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(line) = digits.parse::<u32>() else {
            continue;
        };
        return Some(LocationSplit {
            core: message[..idx].to_string(),
            path: path.to_string(),
            line,
        });
    }
    None
}

/// Parse the bracketed header timestamp, e.g. `01-Jan-2024 00:00:00 UTC`.
///
/// The trailing zone token is accepted and ignored; the naive part is read
/// as UTC. Aggregation only needs a consistent ordering, not wall-clock
/// accuracy across zones.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    const FORMAT: &str = "%d-%b-%Y %H:%M:%S";
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, FORMAT) {
        return Some(naive.and_utc());
    }
    let zone_start = raw.rfind(' ')?;
    NaiveDateTime::parse_from_str(raw[..zone_start].trim_end(), FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Display slug for an error type: ASCII letters only, lowercased.
/// "Fatal error" → "fatalerror".
pub fn type_slug(error_type: &str) -> String {
    error_type
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Remove a trailing `Stack trace:` token from a header message, for the
/// policy that counts announcement headers as records of their own.
pub fn strip_announcement_suffix(message: &str) -> &str {
    let trimmed = message.trim_end();
    if is_trace_announcement(trimmed) {
        trimmed[..trimmed.len() - ANNOUNCEMENT.len()].trim_end()
    } else {
        trimmed
    }
}

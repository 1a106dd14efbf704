//! Sequential, seekable line reader over the log file.
//!
//! The only component that touches the raw file. Lines are surfaced one at a
//! time with their starting byte offset so the caller can resume a later run
//! from wherever this one stopped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::model::{DigestError, LogLine};

pub struct LineCursor<R> {
    reader: BufReader<R>,
    current: Option<LogLine>,
    next_offset: u64,
    size: u64,
}

impl LineCursor<File> {
    /// Open the log file. Failure here is the one fatal startup error:
    /// nothing has been parsed yet, so the caller aborts with no output.
    pub fn open(path: &Path) -> Result<Self, DigestError> {
        let file = File::open(path).map_err(|source| DigestError::OpenLog {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_seekable(file).map_err(DigestError::Io)
    }
}

impl<R: Read + Seek> LineCursor<R> {
    pub fn from_seekable(mut inner: R) -> io::Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        let mut cursor = Self {
            reader: BufReader::new(inner),
            current: None,
            next_offset: 0,
            size,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    /// Total file size in bytes at open time. Saved as the cache offset
    /// after a run so the next run scans only appended bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size
    }

    /// The line currently under the cursor, or `None` at end of file.
    pub fn current(&self) -> Option<&LogLine> {
        self.current.as_ref()
    }

    /// Read the next line. Non-UTF8 bytes are replaced rather than rejected;
    /// log content is passed through, never validated.
    pub fn advance(&mut self) -> io::Result<()> {
        let start = self.next_offset;
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            self.current = None;
            return Ok(());
        }
        self.next_offset = start + read as u64;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        self.current = Some(LogLine {
            text: String::from_utf8_lossy(&buf).into_owned(),
            offset: start,
        });
        Ok(())
    }

    /// Jump to an absolute byte offset and prime the line found there.
    pub fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.next_offset = offset;
        self.advance()
    }
}

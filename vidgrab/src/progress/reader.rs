//! Record reader for child process output.
//!
//! FFmpeg rewrites its status line with carriage returns (`\r`); when the
//! stream is piped those updates are not newline-delimited, so
//! `BufReadExt::lines()` would only surface them at the very end. This reader
//! yields records delimited by either `\n` or `\r`, and hands out a trailing
//! record without terminator at EOF.
//!
//! Records longer than the configured limit are cut; the rest of such a
//! record is skipped up to the next delimiter, so memory stays bounded on
//! output that never breaks its lines.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Default longest record, in bytes.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 64 * 1024;

/// Reads an async stream and yields text records delimited by `\n` or `\r`.
pub struct OutputRecordReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    scratch: [u8; 4096],
    max_record_len: usize,
    /// The head of `pending` was cut; input is dropped until the next delimiter.
    truncated: bool,
}

impl<R> OutputRecordReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_max_record_len(reader, DEFAULT_MAX_RECORD_BYTES)
    }

    pub fn with_max_record_len(reader: R, max_record_len: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            scratch: [0u8; 4096],
            max_record_len: max_record_len.max(1),
            truncated: false,
        }
    }

    /// Returns the next non-empty record from the stream.
    ///
    /// A record split across reads is reassembled before being returned.
    /// Bytes that are not valid UTF-8 are replaced lossily.
    pub async fn next_record(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(idx) = find_record_delimiter(&self.pending) {
                let mut record_bytes: Vec<u8> = self.pending.drain(..idx).collect();
                consume_delimiters(&mut self.pending);
                record_bytes.truncate(self.max_record_len);

                let record = String::from_utf8_lossy(&record_bytes).trim().to_string();
                if record.is_empty() {
                    continue;
                }
                return Ok(Some(record));
            }

            let n = self.reader.read(&mut self.scratch).await?;
            if n == 0 {
                self.pending.truncate(self.max_record_len);
                let record = String::from_utf8_lossy(&self.pending).trim().to_string();
                self.pending.clear();
                return Ok((!record.is_empty()).then_some(record));
            }

            let mut chunk = &self.scratch[..n];
            if self.truncated {
                match find_record_delimiter(chunk) {
                    Some(idx) => {
                        chunk = &chunk[idx..];
                        self.truncated = false;
                    }
                    None => continue,
                }
            }
            self.pending.extend_from_slice(chunk);

            if self.pending.len() > self.max_record_len
                && find_record_delimiter(&self.pending).is_none()
            {
                self.pending.truncate(self.max_record_len);
                self.truncated = true;
            }
        }
    }
}

fn find_record_delimiter(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| matches!(b, b'\n' | b'\r'))
}

fn consume_delimiters(buf: &mut Vec<u8>) {
    let n = buf
        .iter()
        .take_while(|&&b| matches!(b, b'\n' | b'\r'))
        .count();
    if n > 0 {
        buf.drain(..n);
    }
}

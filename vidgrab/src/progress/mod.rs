//! Progress extraction from external tool output.
//!
//! Parsing is line based and side-effect free: a line that does not match a
//! grammar, or that was cut short, simply produces no update.

mod fetch;
mod reader;
mod transcode;

pub use fetch::parse_download_percent;
pub use reader::{DEFAULT_MAX_RECORD_BYTES, OutputRecordReader};
pub use transcode::{
    TranscodeProgress, parse_duration_field, parse_time, parse_time_field,
};

use crate::job::JobKind;

/// Per-run progress parser, selected by job kind.
#[derive(Debug, Clone)]
pub enum ProgressParser {
    /// yt-dlp `[download]  NN.N%` lines.
    Fetch,
    /// FFmpeg `Duration:` banner followed by `time=` updates.
    Transcode(TranscodeProgress),
}

impl ProgressParser {
    /// A fresh parser for one process run of the given kind.
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::Fetch => Self::Fetch,
            JobKind::Transcode => Self::Transcode(TranscodeProgress::new()),
        }
    }

    /// Feed one line of output; returns a percentage in `[0, 100]` when the
    /// line carries progress.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        match self {
            Self::Fetch => parse_download_percent(line),
            Self::Transcode(tracker) => tracker.feed(line),
        }
    }
}

//! Job records and their status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What kind of external process backs a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Remote video fetched by yt-dlp.
    Fetch,
    /// Playlist (URL or uploaded file) remuxed by ffmpeg.
    Transcode,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Transcode => "transcode",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a job.
///
/// `queued → running → {done, error}`; `queued → error` is allowed for jobs
/// that are cancelled or fail to spawn before a process exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is registered, no process started yet.
    Queued,
    /// The external process is (or is about to be) running.
    Running,
    /// Finished with a result file.
    Done,
    /// Failed or cancelled.
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether moving from `self` to `next` follows the status machine.
    ///
    /// Staying in the same non-terminal status is allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Queued)
                | (Queued, Running)
                | (Queued, Error)
                | (Running, Running)
                | (Running, Done)
                | (Running, Error)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked unit of process-backed work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    /// Source URL, or the uploaded playlist name.
    pub source: String,
    /// Requested output variant label.
    pub format: String,
    pub status: JobStatus,
    /// Completion percentage in `[0, 100]`.
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time copy of a job handed to callers.
pub type JobSnapshot = Job;

impl Job {
    pub(crate) fn new(kind: JobKind, source: String, format: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            source,
            format,
            status: JobStatus::Queued,
            progress: 0.0,
            result_file: None,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Merge-patch applied by [`JobRegistry::update`](super::JobRegistry::update).
///
/// `None` leaves a field untouched. `error: Some(None)` clears the error text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub result_file: Option<String>,
    pub error: Option<Option<String>>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn result_file(mut self, name: impl Into<String>) -> Self {
        self.result_file = Some(name.into());
        self
    }

    pub fn error(mut self, detail: impl Into<String>) -> Self {
        self.error = Some(Some(detail.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Result of a registry mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record changed and `updatedAt` was bumped.
    Applied,
    /// The request was valid but changed nothing (e.g. a stale progress value).
    Ignored,
    /// No job with that id.
    NotFound,
    /// The job is already `done`/`error`; the record was left untouched.
    Terminal,
    /// The requested status does not follow the status machine.
    InvalidTransition { from: JobStatus, to: JobStatus },
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Outcome of a transition driven by a job's own worker, as a `Result`.
    ///
    /// Only `cancel_job` finishes a job behind its worker's back, so
    /// `Terminal` maps to [`Error::Cancelled`].
    pub fn into_result(self, id: &str) -> Result<()> {
        match self {
            Self::Applied | Self::Ignored => Ok(()),
            Self::NotFound => Err(Error::not_found("job", id)),
            Self::Terminal => Err(Error::Cancelled),
            Self::InvalidTransition { from, to } => Err(Error::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

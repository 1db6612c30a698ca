//! In-memory job registry.
//!
//! The registry is the single owner of job records. Every mutation runs in
//! one critical section under the write lock and is checked against the
//! status machine, so a late progress callback can never overwrite an exit
//! transition: once a job is terminal, further updates are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::model::{Job, JobKind, JobPatch, JobSnapshot, JobStatus, UpdateOutcome};

/// Message stored on jobs cancelled by a caller.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Shared, cloneable handle to the process-wide job table.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `queued` job with zero progress.
    pub fn create(
        &self,
        kind: JobKind,
        source: impl Into<String>,
        format: impl Into<String>,
    ) -> JobSnapshot {
        let job = Job::new(kind, source.into(), format.into());
        self.jobs.write().insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, kind = %kind, "Job created");
        job
    }

    /// Snapshot of a job, if known.
    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs.read().get(id).cloned()
    }

    /// Snapshots of every job, oldest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut jobs: Vec<_> = self.jobs.read().values().cloned().collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Drop a job record. Not required for correctness; jobs are memory-only.
    pub fn remove(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs.write().remove(id)
    }

    /// Apply a merge-patch.
    ///
    /// Terminal jobs are never modified. A status change must follow the
    /// status machine. Progress is clamped to `[0, 100]`.
    pub fn update(&self, id: &str, patch: JobPatch) -> UpdateOutcome {
        self.mutate(id, |job| {
            if let Some(next) = patch.status {
                if !job.status.can_transition_to(next) {
                    return UpdateOutcome::InvalidTransition {
                        from: job.status,
                        to: next,
                    };
                }
            }
            if patch.is_empty() {
                return UpdateOutcome::Ignored;
            }

            if let Some(status) = patch.status {
                job.status = status;
            }
            if let Some(progress) = patch.progress {
                job.progress = clamp_progress(progress);
            }
            if let Some(name) = patch.result_file {
                job.result_file = Some(name);
            }
            if let Some(error) = patch.error {
                job.error = error;
            }
            UpdateOutcome::Applied
        })
    }

    /// `queued → running`.
    pub fn mark_running(&self, id: &str) -> UpdateOutcome {
        self.transition(id, JobStatus::Running, |_| {})
    }

    /// Record a progress value from the parser.
    ///
    /// Values at or below the current progress are ignored, so progress never
    /// moves backwards within an attempt. Only running jobs accept progress.
    pub fn report_progress(&self, id: &str, progress: f64) -> UpdateOutcome {
        self.mutate(id, |job| {
            if job.status != JobStatus::Running {
                return UpdateOutcome::Ignored;
            }
            let progress = clamp_progress(progress);
            if progress <= job.progress {
                return UpdateOutcome::Ignored;
            }
            job.progress = progress;
            UpdateOutcome::Applied
        })
    }

    /// Annotate a failed attempt and reset progress for the next one.
    ///
    /// The job stays `running`; `attempt` is the number of the attempt that
    /// just failed.
    pub fn begin_retry(&self, id: &str, attempt: u32, max_attempts: u32) -> UpdateOutcome {
        self.mutate(id, |job| {
            if job.status != JobStatus::Running {
                return UpdateOutcome::InvalidTransition {
                    from: job.status,
                    to: JobStatus::Running,
                };
            }
            job.progress = 0.0;
            job.error = Some(format!("Retry {attempt}/{max_attempts}"));
            UpdateOutcome::Applied
        })
    }

    /// `running → done` with full progress and the produced file name.
    pub fn complete(&self, id: &str, result_file: impl Into<String>) -> UpdateOutcome {
        let result_file = result_file.into();
        self.transition(id, JobStatus::Done, move |job| {
            job.progress = 100.0;
            job.result_file = Some(result_file);
            job.error = None;
        })
    }

    /// Move to terminal `error` with a diagnostic.
    pub fn fail(&self, id: &str, detail: impl Into<String>) -> UpdateOutcome {
        let detail = detail.into();
        self.transition(id, JobStatus::Error, move |job| {
            job.error = Some(detail);
        })
    }

    /// Force terminal `error` with the cancellation message.
    ///
    /// A no-op on jobs that already finished.
    pub fn cancel(&self, id: &str) -> UpdateOutcome {
        self.fail(id, CANCELLED_MESSAGE)
    }

    fn transition<F>(&self, id: &str, next: JobStatus, apply: F) -> UpdateOutcome
    where
        F: FnOnce(&mut Job),
    {
        self.mutate(id, |job| {
            if !job.status.can_transition_to(next) {
                return UpdateOutcome::InvalidTransition {
                    from: job.status,
                    to: next,
                };
            }
            job.status = next;
            apply(job);
            UpdateOutcome::Applied
        })
    }

    fn mutate<F>(&self, id: &str, f: F) -> UpdateOutcome
    where
        F: FnOnce(&mut Job) -> UpdateOutcome,
    {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(id) else {
            return UpdateOutcome::NotFound;
        };
        if job.is_terminal() {
            debug!(job_id = %id, status = %job.status, "Dropping update for finished job");
            return UpdateOutcome::Terminal;
        }

        let outcome = f(job);
        if outcome.is_applied() {
            job.updated_at = Utc::now().max(job.updated_at);
        }
        outcome
    }
}

fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

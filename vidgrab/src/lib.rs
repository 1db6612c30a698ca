//! vidgrab library crate.
//!
//! Supervises yt-dlp fetch jobs and ffmpeg transcode jobs: spawning,
//! progress tracking, cancellation, retries and the download history.

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod manifest;
pub mod progress;
pub mod supervisor;
pub mod tools;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use job::{JobKind, JobSnapshot, JobStatus};
pub use supervisor::{JobRequest, Supervisor};

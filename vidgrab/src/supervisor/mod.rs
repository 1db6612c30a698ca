//! Process supervisor.
//!
//! Owns the job registry, the manifest store and the live-process table.
//! [`Supervisor::create_job`] registers a `queued` job and hands the work to a
//! background task, which resolves the tool, runs it, feeds its output to the
//! progress parser and finally records the result. Background failures never
//! escape: they end up as the job's terminal `error`.

mod fetch;
mod metadata;
mod process;
mod retry;
mod transcode;

pub use fetch::{
    AUDIO_ONLY, DownloadedFile, FormatChoice, extract_video_id, fetch_invocation,
    find_downloaded_file,
};
pub use metadata::{
    MAX_METADATA_BYTES, MediaInfo, SizeMap, VideoFormat, VideoInfo, extract_url,
    metadata_invocation, metadata_url, parse_video_info, size_for_height,
};
pub use process::{GENERIC_FAILURE, Invocation, OutputStream, ProcessExit, run_process};
pub use retry::{RetryConfig, run_with_retries};
pub use transcode::{
    TRANSCODE_FORMAT, file_output_name, transcode_invocation, upload_name, upload_temp_name,
    url_output_name,
};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::job::{JobKind, JobRegistry, JobSnapshot, UpdateOutcome};
use crate::manifest::{ManifestEntry, ManifestStore};
use crate::progress::ProgressParser;
use crate::tools::{ResolvedTool, Tool, ToolProvider, ToolStatus};
use crate::utils::fs::{ensure_dir_all, io_error};
use crate::{Error, Result};

/// Job error when yt-dlp exits cleanly but no output file can be found.
pub const ARTIFACT_MISSING: &str = "File not found after download";

/// What a caller asks the supervisor to do.
#[derive(Debug, Clone)]
pub enum JobRequest {
    /// Download a remote video with yt-dlp.
    Fetch { url: String, format: String },
    /// Remux a remote playlist with ffmpeg.
    TranscodeUrl { url: String },
    /// Remux an uploaded playlist with ffmpeg.
    TranscodeFile { file_name: String, contents: Bytes },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Fetch { .. } => JobKind::Fetch,
            Self::TranscodeUrl { .. } | Self::TranscodeFile { .. } => JobKind::Transcode,
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::TranscodeUrl { url } => url,
            Self::TranscodeFile { file_name, .. } => file_name,
        }
    }

    fn format(&self) -> &str {
        match self {
            Self::Fetch { format, .. } => format,
            Self::TranscodeUrl { .. } | Self::TranscodeFile { .. } => TRANSCODE_FORMAT,
        }
    }
}

/// Supervises external fetch and transcode processes.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Supervisor {
    config: Arc<Config>,
    registry: JobRegistry,
    manifest: ManifestStore,
    tools: Arc<dyn ToolProvider>,
    /// Cancellation handle of every job that has not finished yet.
    live: Arc<DashMap<String, CancellationToken>>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("base_dir", &self.config.base_dir)
            .field("jobs", &self.registry.len())
            .field("live", &self.live.len())
            .finish()
    }
}

impl Supervisor {
    pub fn new(config: Config, tools: Arc<dyn ToolProvider>) -> Self {
        let manifest = ManifestStore::new(config.manifest_path());
        Self {
            config: Arc::new(config),
            registry: JobRegistry::new(),
            manifest,
            tools,
            live: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    /// Register a job and start it in the background.
    ///
    /// Returns the `queued` snapshot immediately. Must be called from within
    /// a Tokio runtime.
    pub fn create_job(&self, request: JobRequest) -> JobSnapshot {
        let job = self
            .registry
            .create(request.kind(), request.source(), request.format());

        let token = CancellationToken::new();
        match self.live.entry(job.id.clone()) {
            Entry::Occupied(_) => {
                // Ids are fresh UUIDs; a collision means something is badly wrong.
                self.registry.fail(&job.id, "job already has a live process");
                return job;
            }
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }

        info!(job_id = %job.id, kind = %job.kind, source = %job.source, "Job queued");
        let this = self.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move { this.run_job(job_id, request, token).await });

        job
    }

    pub fn get_job(&self, id: &str) -> Result<JobSnapshot> {
        self.registry
            .get(id)
            .ok_or_else(|| Error::not_found("job", id))
    }

    /// Stop a job.
    ///
    /// Kills the live process if there is one and marks the job
    /// `error` "Cancelled by user" before returning. Cancelling a finished
    /// job changes nothing.
    pub fn cancel_job(&self, id: &str) -> Result<()> {
        if self.registry.get(id).is_none() {
            return Err(Error::not_found("job", id));
        }
        if let Some((_, token)) = self.live.remove(id) {
            token.cancel();
        }
        match self.registry.cancel(id) {
            UpdateOutcome::Applied => info!(job_id = %id, "Job cancelled"),
            outcome => debug!(job_id = %id, ?outcome, "Cancel had no effect on job state"),
        }
        Ok(())
    }

    /// All known jobs, oldest first.
    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.registry.list()
    }

    /// Manifest entries, newest first.
    pub async fn history(&self) -> Vec<ManifestEntry> {
        self.manifest.list().await
    }

    /// Remove entries from the manifest and delete their files.
    ///
    /// Only the final path component of each name is used, so a name can
    /// never reach outside the downloads directory. Returns the number of
    /// manifest entries removed.
    pub async fn delete_history(&self, names: &[String]) -> Result<usize> {
        let names: Vec<String> = names
            .iter()
            .filter_map(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let removed = self.manifest.remove(&names).await?;

        let downloads = self.config.downloads_dir();
        for name in &names {
            let path = downloads.join(name);
            if self.config.is_bookkeeping_path(&path) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Deleted download"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete download"),
            }
        }

        info!(removed, "History entries deleted");
        Ok(removed)
    }

    /// Availability of every external tool.
    pub async fn tool_status(&self) -> Result<Vec<ToolStatus>> {
        let tools = Arc::clone(&self.tools);
        tokio::task::spawn_blocking(move || {
            Tool::ALL
                .into_iter()
                .map(|tool| ToolStatus::probe(tools.as_ref(), tool))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::Other(format!("Tool status task failed: {e}")))
    }

    /// Look up title, best height and expected sizes of a video with yt-dlp.
    ///
    /// `raw` may be pasted text; the first `http(s)://` URL in it is used.
    /// Runs in the caller's task and is not tracked as a job.
    pub async fn probe_metadata(&self, raw: &str) -> Result<MediaInfo> {
        let url = metadata_url(raw)?;
        let tool = self.resolve_tool(Tool::YtDlp).await?;
        let invocation = metadata_invocation(url);

        debug!(url, "Fetching metadata");
        let mut stdout = String::new();
        let exit = run_process(&tool, &invocation, &CancellationToken::new(), |stream, line| {
            if stream == OutputStream::Stdout {
                stdout.push_str(line);
                stdout.push('\n');
            }
        })
        .await?;

        let stderr_tail = exit.stderr_tail.clone();
        exit.into_result()?;
        if stdout.trim().is_empty() {
            let detail = match stderr_tail.trim() {
                "" => "stdout empty",
                tail => tail,
            };
            return Err(Error::Other(format!("No metadata returned: {detail}")));
        }

        let info = MediaInfo::from_info(parse_video_info(&stdout)?);
        info!(url, title = ?info.title, best_height = ?info.best_height, "Metadata fetched");
        Ok(info)
    }

    /// Resolve `tool` on the blocking pool; lookups touch the filesystem and
    /// may run an interpreter once.
    async fn resolve_tool(&self, tool: Tool) -> Result<ResolvedTool> {
        let tools = Arc::clone(&self.tools);
        let resolved = tokio::task::spawn_blocking(move || tools.resolve(tool))
            .await
            .map_err(|e| Error::Other(format!("Lookup of {tool} failed: {e}")))??;
        Ok(resolved)
    }

    async fn run_job(self, job_id: String, request: JobRequest, token: CancellationToken) {
        let kind = request.kind();
        let result = match request {
            JobRequest::Fetch { url, format } => self.run_fetch(&job_id, &url, &format, &token).await,
            JobRequest::TranscodeUrl { url } => {
                let output_name = url_output_name(Utc::now());
                self.run_transcode(&job_id, OsString::from(url), output_name, &token)
                    .await
            }
            JobRequest::TranscodeFile {
                file_name,
                contents,
            } => {
                self.run_upload_transcode(&job_id, &file_name, contents, &token)
                    .await
            }
        };

        self.live.remove(&job_id);

        match result {
            Ok(()) => {}
            Err(Error::Cancelled) => {
                self.registry.cancel(&job_id);
                info!(job_id = %job_id, %kind, "Job stopped after cancellation");
            }
            Err(e) => {
                warn!(job_id = %job_id, %kind, error = %e, "Job failed");
                self.registry.fail(&job_id, e.to_string());
            }
        }
    }

    /// `queued → running`, or `Cancelled` when the job was stopped meanwhile.
    fn enter_running(&self, job_id: &str) -> Result<()> {
        let outcome = self.registry.mark_running(job_id);
        if !outcome.is_applied() {
            debug!(job_id, ?outcome, "Job no longer runnable");
        }
        outcome.into_result(job_id)
    }

    /// Record the produced file and move the job to `done`.
    ///
    /// A job cancelled after its process exited stays `error` and leaves no
    /// manifest entry behind.
    async fn finish(
        &self,
        job_id: &str,
        token: &CancellationToken,
        entry: ManifestEntry,
    ) -> Result<()> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let name = entry.name.clone();
        self.manifest.append(entry).await?;

        let outcome = self.registry.complete(job_id, &name);
        if let Err(e) = outcome.into_result(job_id) {
            debug!(job_id, ?outcome, file = %name, "Job already finished, dropping manifest entry");
            if let Err(remove_err) = self.manifest.remove(std::slice::from_ref(&name)).await {
                warn!(job_id, error = %remove_err, "Failed to drop manifest entry");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Run one process and feed its output to a fresh progress parser.
    async fn run_attempt(
        &self,
        job_id: &str,
        kind: JobKind,
        tool: &ResolvedTool,
        invocation: &Invocation,
        token: &CancellationToken,
    ) -> Result<()> {
        let mut parser = ProgressParser::for_kind(kind);
        let registry = &self.registry;
        let exit = run_process(tool, invocation, token, |_, line| {
            if let Some(progress) = parser.feed(line) {
                registry.report_progress(job_id, progress);
            }
        })
        .await?;
        exit.into_result()
    }

    async fn prepare_downloads(&self) -> Result<PathBuf> {
        let downloads = self.config.downloads_dir();
        ensure_dir_all(&downloads).await?;
        self.manifest.ensure_initialized().await?;
        Ok(downloads)
    }

    async fn run_fetch(
        &self,
        job_id: &str,
        url: &str,
        format: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let downloads = self.prepare_downloads().await?;
        let tool = self.resolve_tool(Tool::YtDlp).await?;
        let invocation = fetch_invocation(url, format, &downloads);

        self.enter_running(job_id)?;
        debug!(job_id, args = ?invocation.args_lossy(), "Starting yt-dlp");
        self.run_attempt(job_id, JobKind::Fetch, &tool, &invocation, token)
            .await?;

        let video_id = extract_video_id(url);
        let config = &self.config;
        let file = find_downloaded_file(&downloads, video_id.as_deref(), |path| {
            config.is_bookkeeping_path(path)
        })
        .await?
        .ok_or_else(|| Error::Other(ARTIFACT_MISSING.to_string()))?;

        self.finish(
            job_id,
            token,
            ManifestEntry::new(video_id, &file.name, file.size, format),
        )
        .await?;
        info!(job_id, file = %file.name, size = file.size, "Fetch finished");
        Ok(())
    }

    async fn run_upload_transcode(
        &self,
        job_id: &str,
        file_name: &str,
        contents: Bytes,
        token: &CancellationToken,
    ) -> Result<()> {
        let now = Utc::now();
        let tmp_dir = self.config.tmp_dir();
        ensure_dir_all(&tmp_dir).await?;
        let tmp_path = tmp_dir.join(upload_temp_name(file_name, now));
        tokio::fs::write(&tmp_path, &contents)
            .await
            .map_err(|e| io_error("storing upload", &tmp_path, e))?;

        let output_name = file_output_name(file_name, now);
        let result = self
            .run_transcode(job_id, tmp_path.clone().into_os_string(), output_name, token)
            .await;

        if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
            debug!(path = %tmp_path.display(), error = %e, "Failed to remove upload");
        }
        result
    }

    async fn run_transcode(
        &self,
        job_id: &str,
        input: OsString,
        output_name: String,
        token: &CancellationToken,
    ) -> Result<()> {
        let downloads = self.prepare_downloads().await?;
        let output = downloads.join(&output_name);
        let tool = self.resolve_tool(Tool::Ffmpeg).await?;
        let invocation = transcode_invocation(input, &output);

        self.enter_running(job_id)?;

        let result = self
            .transcode_and_record(job_id, &tool, &invocation, &output, &output_name, token)
            .await;
        if result.is_err() {
            match tokio::fs::remove_file(&output).await {
                Ok(()) => debug!(job_id, path = %output.display(), "Removed unfinished output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(job_id, path = %output.display(), error = %e, "Failed to remove unfinished output")
                }
            }
        }
        result
    }

    async fn transcode_and_record(
        &self,
        job_id: &str,
        tool: &ResolvedTool,
        invocation: &Invocation,
        output: &Path,
        output_name: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let this = self;
        run_with_retries(
            &self.config.retry,
            token,
            |attempt, max_attempts| {
                info!(job_id, attempt, max_attempts, "Transcode attempt failed, retrying");
                this.registry.begin_retry(job_id, attempt, max_attempts);
            },
            move |attempt| {
                debug!(job_id, attempt, args = ?invocation.args_lossy(), "Starting ffmpeg");
                this.run_attempt(job_id, JobKind::Transcode, tool, invocation, token)
            },
        )
        .await?;

        let size = tokio::fs::metadata(output)
            .await
            .map_err(|e| io_error("reading transcode output", output, e))?
            .len();
        self.finish(
            job_id,
            token,
            ManifestEntry::new(None, output_name, size, TRANSCODE_FORMAT),
        )
        .await?;
        info!(job_id, file = %output_name, size, "Transcode finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::tools::{StaticToolProvider, ToolUnavailable};
    use tempfile::TempDir;

    fn supervisor(temp: &TempDir, tools: StaticToolProvider) -> Supervisor {
        Supervisor::new(Config::with_base_dir(temp.path()), Arc::new(tools))
    }

    async fn wait_terminal(supervisor: &Supervisor, id: &str) -> JobSnapshot {
        for _ in 0..500 {
            let job = supervisor.get_job(id).unwrap();
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    #[test]
    fn test_request_labels() {
        let fetch = JobRequest::Fetch {
            url: "https://youtu.be/a".into(),
            format: "720p".into(),
        };
        assert_eq!(fetch.kind(), JobKind::Fetch);
        assert_eq!(fetch.format(), "720p");

        let upload = JobRequest::TranscodeFile {
            file_name: "list.m3u8".into(),
            contents: Bytes::from_static(b"#EXTM3U\n"),
        };
        assert_eq!(upload.kind(), JobKind::Transcode);
        assert_eq!(upload.source(), "list.m3u8");
        assert_eq!(upload.format(), TRANSCODE_FORMAT);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());
        assert!(matches!(
            supervisor.get_job("missing"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            supervisor.cancel_job("missing"),
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_tool_fails_job_without_running() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());

        let job = supervisor.create_job(JobRequest::TranscodeUrl {
            url: "https://cdn.example/a.m3u8".into(),
        });
        assert_eq!(job.status, JobStatus::Queued);

        let done = wait_terminal(&supervisor, &job.id).await;
        assert_eq!(done.status, JobStatus::Error);
        let expected = ToolUnavailable::NotFound {
            tool: Tool::Ffmpeg,
            searched: Vec::new(),
        }
        .to_string();
        assert_eq!(done.error.as_deref(), Some(expected.as_str()));
        assert!(supervisor.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_tool_status() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(
            &temp,
            StaticToolProvider::new().with(Tool::YtDlp, ResolvedTool::new("/opt/yt-dlp")),
        );
        let status = supervisor.tool_status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(status[0].available);
        assert!(!status[1].available);
    }

    #[tokio::test]
    async fn test_delete_history_removes_entries_and_files() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());
        let downloads = supervisor.config().downloads_dir();
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("a.mp4"), b"a").unwrap();
        std::fs::write(downloads.join("b.mp4"), b"b").unwrap();
        for name in ["a.mp4", "b.mp4"] {
            supervisor
                .manifest()
                .append(ManifestEntry::new(None, name, 1, "m3u8"))
                .await
                .unwrap();
        }

        let removed = supervisor
            .delete_history(&["../../a.mp4".to_string(), "manifest.json".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!downloads.join("a.mp4").exists());
        assert!(downloads.join("b.mp4").exists());
        assert!(supervisor.config().manifest_path().exists());
        let names: Vec<_> = supervisor.history().await.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b.mp4"]);
    }

    fn running_job(supervisor: &Supervisor) -> JobSnapshot {
        let job = supervisor
            .registry()
            .create(JobKind::Transcode, "list.m3u8", TRANSCODE_FORMAT);
        supervisor.registry().mark_running(&job.id);
        std::fs::create_dir_all(supervisor.config().downloads_dir()).unwrap();
        job
    }

    #[tokio::test]
    async fn test_finish_records_entry_and_completes() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());
        let job = running_job(&supervisor);

        supervisor
            .finish(
                &job.id,
                &CancellationToken::new(),
                ManifestEntry::new(None, "out.mp4", 3, TRANSCODE_FORMAT),
            )
            .await
            .unwrap();

        let done = supervisor.get_job(&job.id).unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert_eq!(done.result_file.as_deref(), Some("out.mp4"));
        assert_eq!(supervisor.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_finish_after_cancel_records_nothing() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());
        let job = running_job(&supervisor);
        let token = CancellationToken::new();
        token.cancel();
        supervisor.registry().cancel(&job.id);

        let result = supervisor
            .finish(
                &job.id,
                &token,
                ManifestEntry::new(None, "out.mp4", 3, TRANSCODE_FORMAT),
            )
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(supervisor.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_finish_losing_to_cancel_drops_entry() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());
        let job = running_job(&supervisor);
        supervisor
            .manifest()
            .append(ManifestEntry::new(None, "older.mp4", 1, TRANSCODE_FORMAT))
            .await
            .unwrap();
        // The job was cancelled but the worker has not observed the token yet.
        supervisor.registry().cancel(&job.id);

        let result = supervisor
            .finish(
                &job.id,
                &CancellationToken::new(),
                ManifestEntry::new(None, "out.mp4", 3, TRANSCODE_FORMAT),
            )
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        let job = supervisor.get_job(&job.id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some(crate::job::CANCELLED_MESSAGE));
        let names: Vec<_> = supervisor.history().await.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["older.mp4"]);
    }

    struct SlowProvider;

    impl ToolProvider for SlowProvider {
        fn resolve(&self, _tool: Tool) -> std::result::Result<ResolvedTool, ToolUnavailable> {
            std::thread::sleep(std::time::Duration::from_millis(300));
            Ok(ResolvedTool::new("/opt/tool"))
        }
    }

    #[tokio::test]
    async fn test_tool_lookup_does_not_block_the_runtime() {
        let temp = TempDir::new().unwrap();
        let supervisor = Supervisor::new(Config::with_base_dir(temp.path()), Arc::new(SlowProvider));

        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        });

        let resolved = supervisor.resolve_tool(Tool::Ffmpeg).await.unwrap();
        ticker.abort();

        assert_eq!(resolved.program, PathBuf::from("/opt/tool"));
        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) >= 5);
    }

    #[tokio::test]
    async fn test_metadata_lookup_rejects_bad_input() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(&temp, StaticToolProvider::new());
        let err = supervisor.probe_metadata("not a url").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL");
        let err = supervisor.probe_metadata("").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing URL");
        assert!(matches!(
            supervisor.probe_metadata("https://youtu.be/abc").await,
            Err(Error::ToolUnavailable(_))
        ));
    }
}

//! Child process runner with cancellation and line-oriented output.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::progress::{DEFAULT_MAX_RECORD_BYTES, OutputRecordReader};
use crate::tools::{ResolvedTool, Tool};
use crate::{Error, Result};

/// How long to keep reading output after the child has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Bytes of stderr kept for failure diagnostics.
const STDERR_TAIL_BYTES: usize = 4096;

/// Detail used when a failing process printed nothing on stderr.
pub const GENERIC_FAILURE: &str = "process failed";

/// A tool plus the job-specific arguments and environment to run it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(OsString, OsString)>,
    /// Longest output record handed to the line callback, in bytes.
    pub max_record_len: usize,
}

impl Invocation {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            max_record_len: DEFAULT_MAX_RECORD_BYTES,
        }
    }

    pub fn max_record_len(mut self, bytes: usize) -> Self {
        self.max_record_len = bytes;
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as lossy strings, for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// How a process that ran to completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Last few KiB of stderr.
    pub stderr_tail: String,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Ok for a zero exit, otherwise a [`Error::ProcessFailure`] carrying the
    /// stderr tail.
    pub fn into_result(self) -> Result<()> {
        if self.success() {
            return Ok(());
        }
        let detail = if self.stderr_tail.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            self.stderr_tail
        };
        Err(Error::ProcessFailure {
            code: self.code,
            detail,
        })
    }
}

/// Keeps the most recent stderr lines within a byte budget.
#[derive(Debug)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
    cap: usize,
}

impl StderrTail {
    fn new(cap: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            cap,
        }
    }

    fn push(&mut self, line: &str) {
        let line = tail_bytes(line, self.cap);
        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_string());
        while self.bytes > self.cap && self.lines.len() > 1 {
            if let Some(old) = self.lines.pop_front() {
                self.bytes -= old.len() + 1;
            }
        }
    }

    fn into_string(self) -> String {
        Vec::from(self.lines).join("\n")
    }
}

/// The last `max` bytes of `line` at most, starting on a char boundary.
fn tail_bytes(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut start = line.len() - max;
    while !line.is_char_boundary(start) {
        start += 1;
    }
    &line[start..]
}

fn spawn_reader<R>(
    reader: R,
    stream: OutputStream,
    max_record_len: usize,
    tx: mpsc::Sender<(OutputStream, String)>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut records = OutputRecordReader::with_max_record_len(reader, max_record_len);
        loop {
            match records.next_record().await {
                Ok(Some(line)) => {
                    if tx.send((stream, line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(?stream, error = %e, "Output reader stopped");
                    break;
                }
            }
        }
    })
}

/// Run `invocation` through the resolved `tool` until it exits or `cancel` fires.
///
/// Every stdout/stderr record is handed to `on_line` as it arrives. Returns
/// [`Error::ProcessSpawn`] when the program cannot be started and
/// [`Error::Cancelled`] after killing the child on cancellation. A nonzero
/// exit is not an error here; see [`ProcessExit::into_result`].
pub async fn run_process<F>(
    tool: &ResolvedTool,
    invocation: &Invocation,
    cancel: &CancellationToken,
    mut on_line: F,
) -> Result<ProcessExit>
where
    F: FnMut(OutputStream, &str),
{
    let mut cmd = process_utils::tokio_command(&tool.program);
    cmd.args(&tool.leading_args)
        .args(&invocation.args)
        .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &invocation.cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| Error::ProcessSpawn {
        program: tool.display_name(),
        source,
    })?;
    debug!(tool = %invocation.tool, program = %tool.display_name(), pid = ?child.id(), "Process started");

    let (tx, mut rx) = mpsc::channel(256);
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(
            stdout,
            OutputStream::Stdout,
            invocation.max_record_len,
            tx.clone(),
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(
            stderr,
            OutputStream::Stderr,
            invocation.max_record_len,
            tx.clone(),
        ));
    }
    drop(tx);

    let mut tail = StderrTail::new(STDERR_TAIL_BYTES);
    let mut handle_line = |stream: OutputStream, line: String| {
        trace!(?stream, %line, "process output");
        if stream == OutputStream::Stderr {
            tail.push(&line);
        }
        on_line(stream, &line);
    };

    let status = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill cancelled process");
                }
                for reader in &readers {
                    reader.abort();
                }
                return Err(Error::Cancelled);
            }
            Some((stream, line)) = rx.recv() => handle_line(stream, line),
            status = child.wait() => break status,
        }
    };

    // A background child of the tool can keep the pipes open after exit.
    let drain = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while let Some((stream, line)) = rx.recv().await {
            handle_line(stream, line);
        }
    });
    let drained = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            for reader in &readers {
                reader.abort();
            }
            return Err(Error::Cancelled);
        }
        drained = drain => drained,
    };
    if drained.is_err() {
        debug!("Output still open after exit, detaching readers");
    }
    for reader in &readers {
        reader.abort();
    }

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "Error waiting for process");
            Some(-1)
        }
    };
    if code != Some(0) {
        debug!(?code, "Process exited unsuccessfully");
    }

    Ok(ProcessExit {
        code,
        stderr_tail: tail.into_string(),
    })
}

//! External tool resolution.
//!
//! The supervisor never hardcodes where yt-dlp or ffmpeg live. It asks a
//! [`ToolProvider`] for a [`ResolvedTool`] right before spawning, and a
//! resolution failure becomes a job error instead of a process start.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// External programs the supervisor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tool {
    #[serde(rename = "yt-dlp")]
    YtDlp,
    #[serde(rename = "ffmpeg")]
    Ffmpeg,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::YtDlp, Tool::Ffmpeg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ready-to-spawn command: the program plus any arguments that must
/// precede the job's own arguments (e.g. the script path when running
/// through an interpreter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl ResolvedTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The program name for logs and error messages.
    pub fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Why a tool could not be resolved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolUnavailable {
    #[error("{tool} not found (searched: {})", .searched.join(", "))]
    NotFound { tool: Tool, searched: Vec<String> },

    #[error("{tool} requires {interpreter}, which is not installed")]
    MissingInterpreter { tool: Tool, interpreter: String },

    #[error("{tool} has no bundled binary for platform {platform}")]
    UnsupportedPlatform { tool: Tool, platform: String },
}

/// Source of runnable commands for each [`Tool`].
pub trait ToolProvider: Send + Sync {
    fn resolve(&self, tool: Tool) -> Result<ResolvedTool, ToolUnavailable>;
}

/// Availability of one tool, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolStatus {
    pub fn probe(provider: &dyn ToolProvider, tool: Tool) -> Self {
        match provider.resolve(tool) {
            Ok(resolved) => Self {
                tool,
                available: true,
                program: Some(resolved.program),
                reason: None,
            },
            Err(e) => Self {
                tool,
                available: false,
                program: None,
                reason: Some(e.to_string()),
            },
        }
    }
}

/// First python interpreter that answers `--version`, probed once per process.
static SYSTEM_PYTHON: LazyLock<Option<String>> = LazyLock::new(|| {
    ["python3", "python"]
        .into_iter()
        .find(|candidate| process_utils::probe_version(candidate))
        .map(str::to_string)
});

/// Name of the self-contained yt-dlp build for the current platform.
fn bundled_ytdlp_name() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        Some("yt-dlp_linux")
    } else if cfg!(target_os = "macos") {
        Some("yt-dlp_macos")
    } else if cfg!(windows) {
        Some("yt-dlp.exe")
    } else {
        None
    }
}

/// Resolves tools from configured paths, a bundled binary directory and
/// finally `PATH`.
#[derive(Debug, Clone)]
pub struct SystemToolProvider {
    bin_dir: PathBuf,
    ytdlp_path: Option<PathBuf>,
    ffmpeg_path: Option<PathBuf>,
    /// `None` means probe the system on first use.
    python: Option<Option<String>>,
    search_path: bool,
}

impl SystemToolProvider {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            ytdlp_path: None,
            ffmpeg_path: None,
            python: None,
            search_path: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut provider = Self::new(&config.bin_dir);
        provider.ytdlp_path = config.ytdlp_path.clone();
        provider.ffmpeg_path = config.ffmpeg_path.clone();
        provider
    }

    pub fn with_ytdlp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ytdlp_path = Some(path.into());
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Pin the python interpreter instead of probing (`None` = no python).
    pub fn with_python(mut self, interpreter: Option<&str>) -> Self {
        self.python = Some(interpreter.map(str::to_string));
        self
    }

    /// Enable or disable the final `PATH` lookup.
    pub fn with_path_search(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    fn python(&self) -> Option<&str> {
        match &self.python {
            Some(pinned) => pinned.as_deref(),
            None => SYSTEM_PYTHON.as_deref(),
        }
    }

    fn candidates(&self, tool: Tool) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        match tool {
            Tool::YtDlp => {
                candidates.extend(self.ytdlp_path.clone());
                if let Some(name) = bundled_ytdlp_name() {
                    candidates.push(self.bin_dir.join(name));
                }
                candidates.push(self.bin_dir.join("yt-dlp"));
            }
            Tool::Ffmpeg => {
                candidates.extend(self.ffmpeg_path.clone());
                let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
                candidates.push(self.bin_dir.join(name));
            }
        }
        candidates
    }

    /// Turn an executable candidate into a command, or report the
    /// interpreter it needs but cannot get.
    fn accept(&self, path: &Path) -> Result<ResolvedTool, String> {
        match process_utils::script_interpreter(path) {
            Some(line) if line.contains("python") => match self.python() {
                Some(python) => Ok(ResolvedTool::with_leading_args(python, [path.as_os_str()])),
                None => Err(interpreter_name(&line)),
            },
            _ => Ok(ResolvedTool::new(path)),
        }
    }
}

/// `/usr/bin/env python3` → `python3`.
fn interpreter_name(shebang: &str) -> String {
    shebang
        .split_whitespace()
        .rfind(|part| part.contains("python"))
        .and_then(|part| part.rsplit('/').next())
        .unwrap_or("python")
        .to_string()
}

impl ToolProvider for SystemToolProvider {
    fn resolve(&self, tool: Tool) -> Result<ResolvedTool, ToolUnavailable> {
        let mut candidates = self.candidates(tool);
        let mut searched: Vec<String> = candidates
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        if self.search_path {
            searched.push(format!("PATH/{tool}"));
            candidates.extend(process_utils::find_on_path(tool.as_str()));
        }

        let mut missing_interpreter = None;
        for candidate in candidates {
            if !process_utils::is_executable(&candidate) {
                continue;
            }
            match self.accept(&candidate) {
                Ok(resolved) => {
                    debug!(%tool, program = %resolved.display_name(), "Resolved tool");
                    return Ok(resolved);
                }
                Err(interpreter) => {
                    debug!(%tool, path = %candidate.display(), %interpreter, "Skipping script without interpreter");
                    missing_interpreter.get_or_insert(interpreter);
                }
            }
        }

        if let Some(interpreter) = missing_interpreter {
            return Err(ToolUnavailable::MissingInterpreter { tool, interpreter });
        }
        if tool == Tool::YtDlp && bundled_ytdlp_name().is_none() {
            return Err(ToolUnavailable::UnsupportedPlatform {
                tool,
                platform: std::env::consts::OS.to_string(),
            });
        }
        Err(ToolUnavailable::NotFound { tool, searched })
    }
}

/// Fixed tool table, used by tests and embedders that manage binaries themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticToolProvider {
    tools: HashMap<Tool, ResolvedTool>,
}

impl StaticToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: Tool, resolved: ResolvedTool) -> Self {
        self.tools.insert(tool, resolved);
        self
    }
}

impl ToolProvider for StaticToolProvider {
    fn resolve(&self, tool: Tool) -> Result<ResolvedTool, ToolUnavailable> {
        self.tools
            .get(&tool)
            .cloned()
            .ok_or(ToolUnavailable::NotFound {
                tool,
                searched: Vec::new(),
            })
    }
}

//! Runtime configuration.
//!
//! Values come from built-in defaults, then from the process environment
//! (a `.env` file is loaded first when present). The CLI may override
//! individual fields afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::supervisor::RetryConfig;
use crate::utils::fs::first_writable_dir;
use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "vidgrab=info,process_utils=info";

pub const ENV_BASE_DIR: &str = "VIDGRAB_BASE_DIR";
pub const ENV_BIN_DIR: &str = "VIDGRAB_BIN_DIR";
pub const ENV_YTDLP_PATH: &str = "YTDLP_BINARY_PATH";
pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";
pub const ENV_TRANSCODE_ATTEMPTS: &str = "VIDGRAB_TRANSCODE_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "VIDGRAB_RETRY_DELAY_MS";
pub const ENV_LOG_DIR: &str = "VIDGRAB_LOG_DIR";
pub const ENV_LOG_FILTER: &str = "VIDGRAB_LOG_FILTER";

const DOWNLOADS_DIR_NAME: &str = "downloads";
const TMP_DIR_NAME: &str = "_tmp";
const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Writable base directory; downloads and logs live below it.
    pub base_dir: PathBuf,
    /// Directory searched for bundled tool binaries.
    pub bin_dir: PathBuf,
    /// Explicit yt-dlp location, tried before anything else.
    pub ytdlp_path: Option<PathBuf>,
    /// Explicit ffmpeg location, tried before anything else.
    pub ffmpeg_path: Option<PathBuf>,
    /// Retry behaviour for transcode jobs.
    pub retry: RetryConfig,
    /// Log directory override. Defaults to `<base_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Config {
    /// Configuration rooted at `base_dir` with every other field defaulted.
    ///
    /// No writability probing happens here.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            bin_dir: base_dir.join("bin"),
            base_dir,
            ytdlp_path: None,
            ffmpeg_path: None,
            retry: RetryConfig::default(),
            log_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Load from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// The base directory is the first writable one of: `VIDGRAB_BASE_DIR`,
    /// the current directory, the platform temp directory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut candidates = Vec::new();
        if let Some(dir) = get(ENV_BASE_DIR) {
            candidates.push(PathBuf::from(dir));
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd);
        }
        let mut config = Self::with_base_dir(first_writable_dir(candidates));

        if let Some(dir) = get(ENV_BIN_DIR) {
            config.bin_dir = PathBuf::from(dir);
        }
        config.ytdlp_path = get(ENV_YTDLP_PATH).map(PathBuf::from);
        config.ffmpeg_path = get(ENV_FFMPEG_PATH).map(PathBuf::from);
        config.log_dir = get(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(filter) = get(ENV_LOG_FILTER) {
            config.log_filter = filter;
        }

        if let Some(raw) = get(ENV_TRANSCODE_ATTEMPTS) {
            let attempts: u32 = raw.parse().map_err(|_| {
                Error::config(format!("{ENV_TRANSCODE_ATTEMPTS} must be a number, got {raw:?}"))
            })?;
            config.retry.max_attempts = attempts;
        }
        if let Some(raw) = get(ENV_RETRY_DELAY_MS) {
            let delay: u64 = raw.parse().map_err(|_| {
                Error::config(format!("{ENV_RETRY_DELAY_MS} must be a number, got {raw:?}"))
            })?;
            config.retry.initial_delay_ms = delay;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the supervisor cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::config("transcode attempts must be at least 1"));
        }
        if self.log_filter.trim().is_empty() {
            return Err(Error::config("log filter must not be empty"));
        }
        Ok(())
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.base_dir.join(DOWNLOADS_DIR_NAME)
    }

    /// Scratch space for uploaded playlists.
    pub fn tmp_dir(&self) -> PathBuf {
        self.downloads_dir().join(TMP_DIR_NAME)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.downloads_dir().join(MANIFEST_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("logs"))
    }

    /// Whether `path` is one of the supervisor's own bookkeeping entries in
    /// the downloads directory (manifest, scratch space).
    pub fn is_bookkeeping_path(&self, path: &Path) -> bool {
        path == self.manifest_path() || path == self.tmp_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_derived_paths() {
        let config = Config::with_base_dir("/srv/vidgrab");
        assert_eq!(config.downloads_dir(), Path::new("/srv/vidgrab/downloads"));
        assert_eq!(config.tmp_dir(), Path::new("/srv/vidgrab/downloads/_tmp"));
        assert_eq!(
            config.manifest_path(),
            Path::new("/srv/vidgrab/downloads/manifest.json")
        );
        assert_eq!(config.log_dir(), Path::new("/srv/vidgrab/logs"));
        assert_eq!(config.bin_dir, Path::new("/srv/vidgrab/bin"));
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().to_string_lossy().to_string();
        let config = Config::from_lookup(lookup_from(&[
            (ENV_BASE_DIR, base.as_str()),
            (ENV_FFMPEG_PATH, "/opt/ffmpeg/bin/ffmpeg"),
            (ENV_TRANSCODE_ATTEMPTS, "5"),
            (ENV_RETRY_DELAY_MS, "250"),
            (ENV_LOG_FILTER, "vidgrab=debug"),
        ]))
        .unwrap();

        assert_eq!(config.base_dir, temp.path());
        assert_eq!(
            config.ffmpeg_path.as_deref(),
            Some(Path::new("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert!(config.ytdlp_path.is_none());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 250);
        assert_eq!(config.log_filter, "vidgrab=debug");
    }

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().to_string_lossy().to_string();
        let config = Config::from_lookup(lookup_from(&[
            (ENV_BASE_DIR, base.as_str()),
            (ENV_YTDLP_PATH, "   "),
        ]))
        .unwrap();
        assert!(config.ytdlp_path.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().to_string_lossy().to_string();
        let err = Config::from_lookup(lookup_from(&[
            (ENV_BASE_DIR, base.as_str()),
            (ENV_TRANSCODE_ATTEMPTS, "three"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = Config::from_lookup(lookup_from(&[
            (ENV_BASE_DIR, base.as_str()),
            (ENV_TRANSCODE_ATTEMPTS, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_bookkeeping_paths() {
        let config = Config::with_base_dir("/data");
        assert!(config.is_bookkeeping_path(&config.manifest_path()));
        assert!(config.is_bookkeeping_path(&config.tmp_dir()));
        assert!(!config.is_bookkeeping_path(Path::new("/data/downloads/a [x].mp4")));
    }
}

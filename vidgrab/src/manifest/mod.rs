//! Download history (manifest) store.
//!
//! The manifest is a pretty-printed JSON array of [`ManifestEntry`] objects,
//! newest first, capped at [`MANIFEST_CAP`] entries. Every change is a full
//! read-modify-write of the file. All cycles go through one async mutex, so
//! two jobs finishing at the same instant cannot overwrite each other's
//! entry within this process. Writes land in a sibling temp file that is
//! renamed over the manifest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::utils::fs::{ensure_parent_dir, io_error};
use crate::Result;

/// Maximum number of entries kept in the manifest.
pub const MANIFEST_CAP: usize = 50;

/// A durable record of one produced file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Source-specific identifier (e.g. a video id); written as `null` when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// File name inside the downloads directory.
    pub name: String,
    /// Size in bytes when the entry was recorded.
    pub size: u64,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    /// Requested output variant label.
    pub format: String,
}

impl ManifestEntry {
    pub fn new(
        id: Option<String>,
        name: impl Into<String>,
        size: u64,
        format: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            created_at: Utc::now(),
            format: format.into(),
        }
    }
}

/// Timestamps as `2024-05-01T10:20:30.123Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Store owning the on-disk manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
    cap: usize,
    lock: Arc<Mutex<()>>,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_cap(path, MANIFEST_CAP)
    }

    pub fn with_cap(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the parent directory and an empty `[]` manifest if missing.
    pub async fn ensure_initialized(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        ensure_parent_dir(&self.path).await?;
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.write_unlocked(&[]).await
    }

    /// All entries, newest first.
    ///
    /// A missing, unreadable or corrupt file reads as an empty history.
    pub async fn list(&self) -> Vec<ManifestEntry> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read manifest");
            Vec::new()
        })
    }

    /// Prepend `entry` and keep the newest entries up to the cap.
    pub async fn append(&self, entry: ManifestEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_unlocked().await?;
        debug!(name = %entry.name, size = entry.size, "Recording manifest entry");
        entries.insert(0, entry);
        entries.truncate(self.cap);
        self.write_unlocked(&entries).await
    }

    /// Drop every entry whose name is in `names`. Returns how many were removed.
    pub async fn remove(&self, names: &[String]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_unlocked().await?;
        let before = entries.len();
        entries.retain(|entry| !names.iter().any(|name| name == &entry.name));
        let removed = before - entries.len();
        self.write_unlocked(&entries).await?;
        Ok(removed)
    }

    /// Current entries. A missing or corrupt file is empty; any other read
    /// failure is an error so the history is never overwritten blindly.
    async fn read_unlocked(&self) -> Result<Vec<ManifestEntry>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("reading manifest", &self.path, e)),
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Manifest is corrupt, treating as empty");
                return Ok(Vec::new());
            }
        };

        Ok(values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed manifest entry");
                    None
                }
            })
            .collect())
    }

    async fn write_unlocked(&self, entries: &[ManifestEntry]) -> Result<()> {
        ensure_parent_dir(&self.path).await?;
        let body = serde_json::to_string_pretty(entries)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error("writing manifest", &tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error("replacing manifest", &self.path, e))
    }
}

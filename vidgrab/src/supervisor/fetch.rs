//! yt-dlp invocation and artifact lookup for fetch jobs.

use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;

use super::process::Invocation;
use crate::tools::Tool;
use crate::utils::fs::io_error;
use crate::Result;

/// Format choice that extracts MP3 audio instead of keeping video.
pub const AUDIO_ONLY: &str = "Audio Only (MP3)";

/// Output template; yt-dlp substitutes title, id and extension.
const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Extensions yt-dlp uses for in-progress or auxiliary files.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".tmp"];

static VIDEO_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"[?&]v=([^&]+)").expect("valid regex"),
        Regex::new(r"youtu\.be/([^?&]+)").expect("valid regex"),
        Regex::new(r"youtube\.com/shorts/([^?&]+)").expect("valid regex"),
    ]
});

/// yt-dlp selector and post-processing for a user-facing format choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChoice {
    pub selector: &'static str,
    pub extract_audio: bool,
}

impl FormatChoice {
    pub fn from_label(label: &str) -> Self {
        let selector = match label {
            "1080p" => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            "720p" => "bestvideo[height<=720]+bestaudio/best[height<=720]",
            "480p" => "bestvideo[height<=480]+bestaudio/best[height<=480]",
            AUDIO_ONLY => "bestaudio",
            _ => "bestvideo+bestaudio/best",
        };
        Self {
            selector,
            extract_audio: label == AUDIO_ONLY,
        }
    }
}

/// Pull the video id out of the common YouTube URL shapes.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Build the yt-dlp command line for `url` writing into `downloads_dir`.
pub fn fetch_invocation(url: &str, format_label: &str, downloads_dir: &Path) -> Invocation {
    let choice = FormatChoice::from_label(format_label);
    let mut invocation = Invocation::new(Tool::YtDlp)
        .args(["--format", choice.selector])
        .arg("--output")
        .arg(downloads_dir.join(OUTPUT_TEMPLATE))
        .args(["--no-playlist", "--merge-output-format", "mp4", "--newline"]);

    if choice.extract_audio {
        invocation = invocation.args([
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "192K",
        ]);
    }

    invocation.arg("--").arg(url)
}

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix) || name.contains(&format!("{suffix}-")))
}

/// A downloaded file located after yt-dlp exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub name: String,
    pub size: u64,
}

/// Newest regular file in `dir` whose name contains `[<video_id>]`, or the
/// newest file overall when no id is known.
///
/// Paths for which `is_excluded` returns true (manifest, scratch space) and
/// partial download leftovers are never returned.
pub async fn find_downloaded_file<F>(
    dir: &Path,
    video_id: Option<&str>,
    is_excluded: F,
) -> Result<Option<DownloadedFile>>
where
    F: Fn(&Path) -> bool,
{
    let token = video_id.map(|id| format!("[{id}]"));
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| io_error("listing downloads", dir, e))?;

    let mut newest: Option<(SystemTime, DownloadedFile)> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_error("listing downloads", dir, e))?
    {
        let path = entry.path();
        if is_excluded(&path) {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_partial(&name) {
            continue;
        }
        if let Some(token) = &token
            && !name.contains(token.as_str())
        {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(best, _)| modified > *best) {
            newest = Some((
                modified,
                DownloadedFile {
                    name,
                    size: meta.len(),
                },
            ));
        }
    }

    Ok(newest.map(|(_, file)| file))
}

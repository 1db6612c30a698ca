//! FFmpeg invocation and output naming for transcode jobs.

use std::ffi::OsString;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::process::Invocation;
use crate::tools::Tool;
use crate::utils::filename::{
    MAX_NAME_CHARS, file_stem, safe_name, timestamp_slug, truncate_chars,
};

/// Format label recorded for transcode results.
pub const TRANSCODE_FORMAT: &str = "m3u8";

/// Name used for uploads that arrive without one.
const DEFAULT_UPLOAD_NAME: &str = "input.m3u8";

/// Protocols ffmpeg may open while following a playlist.
const PROTOCOL_WHITELIST: &str = "file,http,https,tcp,tls,crypto";

/// Remux `input` (URL or local playlist) into `output` without re-encoding.
pub fn transcode_invocation(input: impl Into<OsString>, output: &Path) -> Invocation {
    Invocation::new(Tool::Ffmpeg)
        .args(["-protocol_whitelist", PROTOCOL_WHITELIST, "-i"])
        .arg(input)
        .args(["-c", "copy", "-bsf:a", "aac_adtstoasc", "-y"])
        .arg(output)
}

/// Output name for a playlist fetched from a URL.
pub fn url_output_name(at: DateTime<Utc>) -> String {
    safe_name(&format!("m3u8_{}.mp4", timestamp_slug(at)))
}

/// Sanitized name of an uploaded playlist.
pub fn upload_name(original: &str) -> String {
    let name = if original.trim().is_empty() {
        DEFAULT_UPLOAD_NAME
    } else {
        original
    };
    safe_name(name)
}

/// Scratch file name for an upload, unique per millisecond.
pub fn upload_temp_name(original: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", at.timestamp_millis(), upload_name(original))
}

/// Output name for an uploaded playlist: `<stem>_<timestamp>.mp4`.
///
/// Long stems are shortened so the timestamp and extension always survive
/// the length cap.
pub fn file_output_name(original: &str, at: DateTime<Utc>) -> String {
    let name = upload_name(original);
    let suffix = format!("_{}.mp4", timestamp_slug(at));
    let budget = MAX_NAME_CHARS.saturating_sub(suffix.chars().count());
    format!("{}{suffix}", truncate_chars(file_stem(&name), budget))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap() + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn test_transcode_invocation() {
        let inv = transcode_invocation("https://cdn.example/live.m3u8", Path::new("out.mp4"));
        assert_eq!(inv.tool, Tool::Ffmpeg);
        assert_eq!(
            inv.args_lossy(),
            vec![
                "-protocol_whitelist",
                "file,http,https,tcp,tls,crypto",
                "-i",
                "https://cdn.example/live.m3u8",
                "-c",
                "copy",
                "-bsf:a",
                "aac_adtstoasc",
                "-y",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_url_output_name() {
        assert_eq!(url_output_name(at()), "m3u8_2024-05-01T10-20-30-123Z.mp4");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            file_output_name("show:ep1.m3u8", at()),
            "show_ep1_2024-05-01T10-20-30-123Z.mp4"
        );
        assert_eq!(
            file_output_name("", at()),
            "input_2024-05-01T10-20-30-123Z.mp4"
        );
        assert_eq!(
            upload_temp_name("a/b.m3u8", at()),
            format!("{}_a_b.m3u8", at().timestamp_millis())
        );
    }

    #[test]
    fn test_long_upload_name_keeps_timestamp_and_extension() {
        let long = format!("{}.m3u8", "x".repeat(300));
        let name = file_output_name(&long, at());
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        assert!(name.starts_with("xxx"));
        assert!(name.ends_with("_2024-05-01T10-20-30-123Z.mp4"), "{name}");

        let later = file_output_name(&long, at() + chrono::Duration::milliseconds(1));
        assert_ne!(name, later);
    }

    #[test]
    fn test_long_unicode_upload_name() {
        let long = format!("{}.m3u8", "视".repeat(200));
        let name = file_output_name(&long, at());
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        assert!(name.ends_with(".mp4"));
    }
}

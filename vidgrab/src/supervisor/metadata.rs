//! Media metadata lookup through yt-dlp.
//!
//! `yt-dlp --dump-single-json` prints one JSON document describing the
//! video. Only the title and the per-format heights and sizes are kept; they
//! are enough to show how large each [`FormatChoice`](super::FormatChoice)
//! download would be.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::process::Invocation;
use crate::tools::Tool;
use crate::{Error, Result};

/// Longest JSON document accepted from yt-dlp, in bytes.
pub const MAX_METADATA_BYTES: usize = 64 * 1024 * 1024;

/// Height limit standing in for "no limit" when picking the best format.
const BEST_HEIGHT_LIMIT: u32 = 9999;

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url regex is valid"));

/// The first `http(s)://` URL in pasted text, or the trimmed text itself.
pub fn extract_url(raw: &str) -> &str {
    let trimmed = raw.trim();
    HTTP_URL
        .find(trimmed)
        .map(|m| m.as_str())
        .unwrap_or(trimmed)
}

/// Validate user input and return the URL to look up.
pub fn metadata_url(raw: &str) -> Result<&str> {
    let url = extract_url(raw);
    if url.is_empty() {
        return Err(Error::Other("Missing URL".to_string()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::Other("Invalid URL".to_string()));
    }
    Ok(url)
}

/// Metadata-only yt-dlp run for `url`.
pub fn metadata_invocation(url: &str) -> Invocation {
    Invocation::new(Tool::YtDlp)
        .args([
            "--dump-single-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            "--",
        ])
        .arg(url)
        .max_record_len(MAX_METADATA_BYTES)
}

/// The subset of yt-dlp's info dict that is used here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<VideoFormat>>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFormat {
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

impl VideoFormat {
    /// Video height for formats that carry video, `None` for audio-only ones.
    fn video_height(&self) -> Option<u32> {
        if self.vcodec.as_deref() == Some("none") {
            return None;
        }
        self.height
            .filter(|h| h.is_finite() && *h >= 1.0)
            .map(|h| h as u32)
    }

    fn size(&self) -> Option<u64> {
        byte_count(self.filesize).or_else(|| byte_count(self.filesize_approx))
    }
}

fn byte_count(value: Option<f64>) -> Option<u64> {
    value.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)
}

/// Expected download size per format choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SizeMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<u64>,
    #[serde(rename = "1080", skip_serializing_if = "Option::is_none")]
    pub p1080: Option<u64>,
    #[serde(rename = "720", skip_serializing_if = "Option::is_none")]
    pub p720: Option<u64>,
    #[serde(rename = "480", skip_serializing_if = "Option::is_none")]
    pub p480: Option<u64>,
}

/// What a metadata lookup reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub title: Option<String>,
    pub best_height: Option<u32>,
    pub size_bytes: Option<u64>,
    pub size_map: SizeMap,
}

/// Size of the tallest video format no taller than `limit`.
///
/// The first format listed wins among formats of equal height.
pub fn size_for_height(formats: &[VideoFormat], limit: u32) -> Option<u64> {
    let mut pick: Option<(u32, &VideoFormat)> = None;
    for format in formats {
        let Some(height) = format.video_height().filter(|h| *h <= limit) else {
            continue;
        };
        if pick.is_none_or(|(best, _)| height > best) {
            pick = Some((height, format));
        }
    }
    pick.and_then(|(_, format)| format.size())
}

impl MediaInfo {
    pub fn from_info(info: VideoInfo) -> Self {
        let mut best_height = 0;
        let mut size_bytes = None;
        let mut size_map = SizeMap::default();

        if let Some(formats) = &info.formats {
            for format in formats {
                if let Some(height) = format.video_height()
                    && height > best_height
                {
                    best_height = height;
                    size_bytes = format.size();
                }
            }
            size_map = SizeMap {
                best: size_for_height(formats, BEST_HEIGHT_LIMIT),
                p1080: size_for_height(formats, 1080),
                p720: size_for_height(formats, 720),
                p480: size_for_height(formats, 480),
            };
        }

        let size_bytes = size_bytes
            .or_else(|| byte_count(info.filesize))
            .or_else(|| byte_count(info.filesize_approx));

        Self {
            title: info.title,
            best_height: (best_height > 0).then_some(best_height),
            size_bytes,
            size_map,
        }
    }
}

/// Parse the info JSON out of yt-dlp's stdout.
///
/// Anything printed around the document is ignored: the text between the
/// first `{` and the last `}` is parsed when the output does not start with
/// the document itself.
pub fn parse_video_info(stdout: &str) -> Result<VideoInfo> {
    let trimmed = stdout.trim();
    let document = if trimmed.starts_with('{') {
        trimmed
    } else {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if end > start => &trimmed[start..=end],
            _ => return Err(Error::Other("Failed to parse metadata".to_string())),
        }
    };
    serde_json::from_str(document)
        .map_err(|e| Error::Other(format!("Failed to parse metadata: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(
        height: Option<f64>,
        vcodec: &str,
        filesize: Option<f64>,
        approx: Option<f64>,
    ) -> VideoFormat {
        VideoFormat {
            height,
            vcodec: Some(vcodec.to_string()),
            filesize,
            filesize_approx: approx,
        }
    }

    #[test]
    fn test_extract_url_from_pasted_text() {
        assert_eq!(
            extract_url("  watch this https://youtu.be/abc?t=3 now"),
            "https://youtu.be/abc?t=3"
        );
        assert_eq!(extract_url(" plain "), "plain");
    }

    #[test]
    fn test_metadata_url_validation() {
        assert_eq!(metadata_url("https://a.example/v").unwrap(), "https://a.example/v");
        assert_eq!(metadata_url("   ").unwrap_err().to_string(), "Missing URL");
        assert_eq!(
            metadata_url("ftp://a.example/v").unwrap_err().to_string(),
            "Invalid URL"
        );
    }

    #[test]
    fn test_metadata_invocation() {
        let inv = metadata_invocation("https://youtu.be/abc");
        assert_eq!(inv.tool, Tool::YtDlp);
        assert_eq!(
            inv.args_lossy(),
            vec![
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--",
                "https://youtu.be/abc",
            ]
        );
        assert_eq!(inv.max_record_len, MAX_METADATA_BYTES);
    }

    #[test]
    fn test_parse_video_info_with_noise() {
        let info = parse_video_info("  {\"title\": \"Clip\"}\n").unwrap();
        assert_eq!(info.title.as_deref(), Some("Clip"));

        let info = parse_video_info("WARNING: something\n{\"title\": \"Clip\"}\ntrailer").unwrap();
        assert_eq!(info.title.as_deref(), Some("Clip"));

        assert!(parse_video_info("no json here").is_err());
        assert!(parse_video_info("} backwards {").is_err());
        assert!(parse_video_info("{not json}").is_err());
    }

    #[test]
    fn test_size_for_height_picks_tallest_under_limit() {
        let formats = vec![
            format(Some(360.0), "avc1", Some(100.0), None),
            format(Some(720.0), "avc1", Some(700.0), None),
            format(Some(720.0), "vp9", Some(650.0), None),
            format(Some(1080.0), "avc1", None, Some(1500.0)),
            format(Some(2160.0), "none", Some(9.0), None),
        ];
        assert_eq!(size_for_height(&formats, 9999), Some(1500));
        assert_eq!(size_for_height(&formats, 1080), Some(1500));
        assert_eq!(size_for_height(&formats, 720), Some(700));
        assert_eq!(size_for_height(&formats, 480), Some(100));
        assert_eq!(size_for_height(&formats, 240), None);
    }

    #[test]
    fn test_size_for_height_without_size_is_none() {
        let formats = vec![
            format(Some(480.0), "avc1", Some(10.0), None),
            format(Some(720.0), "avc1", None, None),
        ];
        assert_eq!(size_for_height(&formats, 720), None);
    }

    #[test]
    fn test_media_info_from_formats() {
        let info: VideoInfo = serde_json::from_str(
            r#"{
                "title": "Clip",
                "filesize": 5,
                "formats": [
                    {"format_id": "140", "vcodec": "none", "height": null, "filesize": 42},
                    {"height": 480, "vcodec": "avc1", "filesize": 480},
                    {"height": 1080, "vcodec": "avc1", "filesize_approx": 1080.7},
                    {"height": 720, "vcodec": "avc1", "filesize": 720}
                ]
            }"#,
        )
        .unwrap();

        let media = MediaInfo::from_info(info);
        assert_eq!(media.title.as_deref(), Some("Clip"));
        assert_eq!(media.best_height, Some(1080));
        assert_eq!(media.size_bytes, Some(1080));
        assert_eq!(
            media.size_map,
            SizeMap {
                best: Some(1080),
                p1080: Some(1080),
                p720: Some(720),
                p480: Some(480),
            }
        );
    }

    #[test]
    fn test_media_info_falls_back_to_top_level_size() {
        let info: VideoInfo =
            serde_json::from_str(r#"{"title": null, "filesize_approx": 900}"#).unwrap();
        let media = MediaInfo::from_info(info);
        assert_eq!(media.title, None);
        assert_eq!(media.best_height, None);
        assert_eq!(media.size_bytes, Some(900));
        assert_eq!(media.size_map, SizeMap::default());

        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["bestHeight"], serde_json::Value::Null);
        assert_eq!(json["sizeMap"], serde_json::json!({}));
    }

    #[test]
    fn test_size_map_serializes_resolution_keys() {
        let map = SizeMap {
            best: Some(3),
            p1080: Some(2),
            p720: None,
            p480: Some(1),
        };
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            serde_json::json!({"best": 3, "1080": 2, "480": 1})
        );
    }
}

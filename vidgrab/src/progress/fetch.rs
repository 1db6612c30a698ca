//! yt-dlp progress parsing.
//!
//! With `--newline`, yt-dlp prints one status line per update:
//! `[download]  45.2% of 10.00MiB at  1.20MiB/s ETA 00:07`.

use std::sync::LazyLock;

use regex::Regex;

static DOWNLOAD_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").expect("download progress regex is valid")
});

/// Parse a yt-dlp `[download]` progress line into a percentage in `[0, 100]`.
///
/// # Returns
/// * `Some(f64)` - If the line carries a download percentage
/// * `None` - For any other line, including truncated progress lines
pub fn parse_download_percent(line: &str) -> Option<f64> {
    let caps = DOWNLOAD_PERCENT.captures(line)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 100.0))
}

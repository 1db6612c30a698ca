//! FFmpeg output parsing utilities.
//!
//! FFmpeg reports the input length once near startup
//! (`Duration: 00:03:00.00, start: 0.000000, bitrate: ...`) and then emits
//! periodic status lines containing `time=HH:MM:SS.ms`.

/// Parse time string in HH:MM:SS.ms format to seconds.
///
/// # Arguments
/// * `time_str` - Time string in format "HH:MM:SS.ms" (e.g., "01:30:45.50")
///
/// # Returns
/// * `Some(f64)` - Total seconds if parsing succeeds
/// * `None` - If the format is invalid or the value is negative
///
/// # Examples
/// ```ignore
/// assert_eq!(parse_time("00:00:10.50"), Some(10.5));
/// assert_eq!(parse_time("01:30:00.00"), Some(5400.0));
/// assert_eq!(parse_time("invalid"), None);
/// ```
pub fn parse_time(time_str: &str) -> Option<f64> {
    let time_str = time_str.trim();
    if time_str.starts_with('-') {
        return None;
    }

    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    (total.is_finite() && total >= 0.0).then_some(total)
}

/// Parse the `Duration:` field of the input banner (e.g. "Duration: 00:03:00.00, start: 0").
///
/// `Duration: N/A` (live inputs) yields `None`.
pub fn parse_duration_field(line: &str) -> Option<f64> {
    let start = line.find("Duration:")?;
    let rest = line[start + "Duration:".len()..].trim_start();
    let end = rest
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(rest.len());
    parse_time(&rest[..end])
}

/// Parse time field from FFmpeg output line (e.g., "time=00:01:30.50").
pub fn parse_time_field(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let end = time_str.find(' ').unwrap_or(time_str.len());
    parse_time(&time_str[..end])
}

/// Stateful FFmpeg progress tracker for a single process run.
///
/// Create a fresh tracker per attempt; it keeps no memory across runs.
#[derive(Debug, Clone, Default)]
pub struct TranscodeProgress {
    duration_secs: Option<f64>,
}

impl TranscodeProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total input duration, once the banner has been seen.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Feed one output line.
    ///
    /// Returns the completion percentage when the line is a `time=` update
    /// and the total duration is already known.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if self.duration_secs.is_none() {
            if let Some(total) = parse_duration_field(line).filter(|d| *d > 0.0) {
                self.duration_secs = Some(total);
                return None;
            }
        }

        let total = self.duration_secs?;
        let elapsed = parse_time_field(line)?;
        Some((elapsed / total * 100.0).clamp(0.0, 100.0))
    }
}

//! Filename sanitization utilities for cross-platform compatibility.
//!
//! Output names are derived from user input (uploaded playlist names) and
//! from timestamps, so they are cleaned before touching the filesystem.

use chrono::{DateTime, SecondsFormat, Utc};

/// Characters that are invalid in Windows filenames
const WINDOWS_INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest file name (in characters) produced by [`safe_name`].
pub const MAX_NAME_CHARS: usize = 120;

/// Replace every run of characters that are invalid on Windows (or control
/// characters) with a single underscore, then cap the result at
/// [`MAX_NAME_CHARS`] characters.
///
/// # Examples
///
/// ```
/// use vidgrab::utils::filename::safe_name;
///
/// assert_eq!(safe_name("a<>b.m3u8"), "a_b.m3u8");
/// assert_eq!(safe_name("观看一只青蛙?.m3u8"), "观看一只青蛙_.m3u8");
/// ```
pub fn safe_name(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if c.is_control() || WINDOWS_INVALID_CHARS.contains(&c) {
            if !last_was_replacement {
                result.push('_');
                last_was_replacement = true;
            }
        } else {
            result.push(c);
            last_was_replacement = false;
        }
    }

    truncate_chars(&result, MAX_NAME_CHARS).to_string()
}

/// The first `max` characters of `name`.
pub fn truncate_chars(name: &str, max: usize) -> &str {
    match name.char_indices().nth(max) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Timestamp fragment used to keep output names unique, e.g.
/// `2024-05-01T10-20-30-123Z`.
pub fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// File stem of an uploaded name (`list.m3u8` -> `list`).
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

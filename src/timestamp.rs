//! Conversion between seconds and the WebVTT `[h:]mm:ss.mmm` timestamp form.

use once_cell::sync::Lazy;
use regex::Regex;

/// Unanchored timestamp pattern, shared with the cue timing line grammar.
/// Minutes and seconds are limited to `00`-`59`.
pub(crate) const TIMESTAMP_PATTERN: &str = r"(?:(\d+):)?([0-5]\d):([0-5]\d)\.(\d{3})";

static TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", TIMESTAMP_PATTERN)).unwrap());

/// Format `seconds` as `mm:ss.mmm`, or `h:mm:ss.mmm` when the hour is nonzero.
///
/// Values are rounded to the nearest millisecond. Negative values and NaN
/// format as zero, and values beyond `u64::MAX` milliseconds saturate.
pub fn format(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let secs = total_ms / 1000 % 60;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// Parse a `[h:]mm:ss.mmm` timestamp into seconds.
pub fn parse(text: &str) -> Option<f64> {
    let caps = TIMESTAMP_REGEX.captures(text)?;
    from_parts(
        caps.get(1).map(|m| m.as_str()),
        &caps[2],
        &caps[3],
        &caps[4],
    )
}

/// Combine already-matched timestamp fields into seconds.
///
/// Returns `None` if the hour field is too large to count in milliseconds.
pub(crate) fn from_parts(hours: Option<&str>, minutes: &str, secs: &str, millis: &str) -> Option<f64> {
    let hours: u64 = match hours {
        Some(h) => h.parse().ok()?,
        None => 0,
    };
    let minutes: u64 = minutes.parse().ok()?;
    let secs: u64 = secs.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;

    let total_ms = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(secs)?
        .checked_mul(1000)?
        .checked_add(millis)?;
    Some(total_ms as f64 / 1000.0)
}

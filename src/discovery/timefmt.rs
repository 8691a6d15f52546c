//! Parsing of the human-readable time strings shown on channel pages.

use std::time::Duration;

use tracing::warn;

/// Age assumed for an item whose "published ... ago" text cannot be read.
pub const DEFAULT_AGE: Duration = Duration::from_secs(10 * 60);

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parses relative ages like `"3 days ago"` or `"Streamed 1 hour ago"`.
///
/// Months count as 30 days and years as 365 days.
pub fn parse_relative_age(text: &str) -> Result<Duration, String> {
    let lowered = text.to_lowercase().replace("ago", "");
    let parts: Vec<&str> = lowered.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(format!("invalid age: {}", text));
    }

    let amount = parts[parts.len() - 2]
        .parse::<u64>()
        .map_err(|_| format!("invalid age: {}", text))?;
    let unit = parts[parts.len() - 1];

    let seconds = if unit.contains("second") {
        1
    } else if unit.contains("minute") {
        MINUTE
    } else if unit.contains("hour") {
        HOUR
    } else if unit.contains("day") {
        DAY
    } else if unit.contains("week") {
        7 * DAY
    } else if unit.contains("month") {
        30 * DAY
    } else if unit.contains("year") {
        365 * DAY
    } else {
        return Err(format!("invalid age unit: {}", text));
    };

    amount
        .checked_mul(seconds)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("age out of range: {}", text))
}

/// Parses clock-style lengths: `"42"`, `"4:02"`, `"1:04:02"`.
pub fn parse_length(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty length".to_string());
    }

    let fields = text
        .split(':')
        .map(|f| f.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| format!("invalid length: {}", text))?;

    let secs = match fields.as_slice() {
        [s] => Some(*s),
        [m, s] => m.checked_mul(MINUTE).and_then(|m| m.checked_add(*s)),
        [h, m, s] => h
            .checked_mul(HOUR)
            .zip(m.checked_mul(MINUTE))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(*s)),
        _ => return Err(format!("invalid length: {}", text)),
    };

    secs.map(Duration::from_secs)
        .ok_or_else(|| format!("length out of range: {}", text))
}

/// Lenient form of [`parse_relative_age`]: falls back to [`DEFAULT_AGE`].
pub fn age_or_default(text: &str) -> Duration {
    parse_relative_age(text).unwrap_or_else(|e| {
        warn!("Failed to parse published time '{}': {}", text, e);
        DEFAULT_AGE
    })
}

/// Lenient form of [`parse_length`]: falls back to zero.
pub fn length_or_zero(text: &str) -> Duration {
    parse_length(text).unwrap_or_else(|e| {
        warn!("Failed to parse length '{}': {}", text, e);
        Duration::ZERO
    })
}

/// Formats a length as `01:00:10`, `10:10` or `00:10`.
pub fn format_length(length: Duration) -> String {
    let total = length.as_secs();
    let (h, m, s) = (total / HOUR, (total % HOUR) / MINUTE, total % MINUTE);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

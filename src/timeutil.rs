//! Duration parsing and human-friendly formatting for sizes and times.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Parses durations such as `30s`, `15m`, `1d12h` or `1w1d`. Units are `w`,
/// `d`, `h`, `m` and `s`, each preceded by a whole number.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::FlagParse("empty duration".to_string()));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let multiplier = match c {
            'w' => 7 * 24 * 60 * 60,
            'd' => 24 * 60 * 60,
            'h' => 60 * 60,
            'm' => 60,
            's' => 1,
            _ => return Err(Error::FlagParse(format!("invalid duration unit '{c}'"))),
        };

        let value: u64 = digits
            .parse()
            .map_err(|_| Error::FlagParse(format!("invalid duration '{input}'")))?;
        digits.clear();

        total = value
            .checked_mul(multiplier)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| Error::FlagParse(format!("duration '{input}' overflows")))?;
    }

    if !digits.is_empty() {
        return Err(Error::FlagParse(format!("missing unit in duration '{input}'")));
    }

    Ok(Duration::from_secs(total))
}

/// Formats a duration compactly, e.g. `15m0s` or `1h30m0s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

/// SI byte sizes: `12 B`, `1.0 kB`, `2.5 MB`.
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["kB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 1000 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if value < 10.0 {
        format!("{value:.1} {}", UNITS[unit])
    } else {
        format!("{value:.0} {}", UNITS[unit])
    }
}

/// Relative time from now: `now`, `5 minutes ago`, `in 2 hours`.
#[must_use]
pub fn human_time(at: DateTime<Utc>) -> String {
    human_time_since(at, Utc::now())
}

#[must_use]
pub fn human_time_since(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at);
    let (secs, suffix_past) = if delta.num_seconds() >= 0 {
        (delta.num_seconds(), true)
    } else {
        (-delta.num_seconds(), false)
    };

    if secs < 1 {
        return "now".to_string();
    }

    let (amount, unit) = match secs {
        s if s < 60 => (s, "second"),
        s if s < 3600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3600, "hour"),
        s if s < 7 * 86_400 => (s / 86_400, "day"),
        s if s < 30 * 86_400 => (s / (7 * 86_400), "week"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };

    let plural = if amount == 1 { "" } else { "s" };
    if suffix_past {
        format!("{amount} {unit}{plural} ago")
    } else {
        format!("in {amount} {unit}{plural}")
    }
}

//! ISO-8601 duration parsing for engine-reported elapsed times.
//!
//! The deployment engine reports operation durations as ISO-8601 strings
//! such as `PT1M32.5S` or `P1DT2H`. Only the time designators that actually
//! appear in engine output are supported: days, hours, minutes, and seconds
//! with an optional fractional part.

use std::time::Duration;

/// Parse an ISO-8601 duration string.
///
/// Returns `None` for anything that does not parse; callers treat an
/// unparseable duration as zero.
pub fn parse_iso8601_duration(input: &str) -> Option<Duration> {
    let rest = input.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut total = Duration::ZERO;

    if !date_part.is_empty() {
        let days_str = date_part.strip_suffix('D')?;
        let days: u64 = days_str.parse().ok()?;
        total += Duration::from_secs(days * 86_400);
    }

    if let Some(time) = time_part {
        if time.is_empty() {
            return None;
        }
        let mut number = String::new();
        for ch in time.chars() {
            match ch {
                '0'..='9' | '.' => number.push(ch),
                'H' => {
                    let hours: u64 = number.parse().ok()?;
                    total += Duration::from_secs(hours * 3_600);
                    number.clear();
                }
                'M' => {
                    let minutes: u64 = number.parse().ok()?;
                    total += Duration::from_secs(minutes * 60);
                    number.clear();
                }
                'S' => {
                    let seconds: f64 = number.parse().ok()?;
                    if !seconds.is_finite() || seconds < 0.0 {
                        return None;
                    }
                    total += Duration::from_secs_f64(seconds);
                    number.clear();
                }
                _ => return None,
            }
        }
        if !number.is_empty() {
            return None;
        }
    } else if date_part.is_empty() {
        return None;
    }

    Some(total)
}

/// Truncate a duration to millisecond precision.
pub fn truncate_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

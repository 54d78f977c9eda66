//! Parsing of operator-entered schedule times
//!
//! Supports relative durations ("15m", "2h") and natural language
//! ("tomorrow 3pm"). The result is always an absolute UTC instant; the
//! scheduling engine itself only ever deals in absolute times.

use crate::{PostwrightError, Result};
use chrono::{DateTime, Duration, Utc};

/// Parse a schedule string into a DateTime
///
/// Supports multiple formats:
/// - Relative durations: "1h", "30m", "2d"
/// - Natural language: "tomorrow", "next monday 10am"
/// - Absolute times: "2026-09-20 15:00"
///
/// # Errors
///
/// Returns an error if the time format is invalid or cannot be parsed.
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PostwrightError::InvalidInput(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    // Try duration parsing first
    if let Ok(duration) = parse_duration(input) {
        return Ok(Utc::now() + duration);
    }

    // Try natural language parsing
    if let Ok(dt) = parse_natural_language(input) {
        return Ok(dt);
    }

    Err(PostwrightError::InvalidInput(format!(
        "Could not parse schedule string: {}",
        input
    )))
}

/// Parse a duration string into a chrono::Duration
fn parse_duration(input: &str) -> Result<Duration> {
    if let Ok(std_duration) = humantime::parse_duration(input) {
        let seconds = std_duration.as_secs() as i64;
        return Duration::try_seconds(seconds)
            .ok_or_else(|| PostwrightError::InvalidInput("Duration out of range".to_string()));
    }

    Err(PostwrightError::InvalidInput(format!(
        "Could not parse duration: {}",
        input
    )))
}

/// Parse natural language time expression
fn parse_natural_language(input: &str) -> Result<DateTime<Utc>> {
    chrono_english::parse_date_string(input, Utc::now(), chrono_english::Dialect::Us)
        .map_err(|e| PostwrightError::InvalidInput(format!("Could not parse time: {}", e)))
}

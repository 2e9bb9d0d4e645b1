//! Duration values in config files ("100ms", "30s", "5m", "1h")

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string. A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty duration string".to_string());
    }

    let (num_str, unit) = s
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| s.split_at(i))
        .unwrap_or((s, "s"));

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", s))?;

    let millis_per_unit: u64 = match unit.trim().to_lowercase().as_str() {
        "ms" => 1,
        "s" | "" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        _ => return Err(format!("Unknown duration unit: {}", unit)),
    };

    num.checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("Duration value too large: {}", s))
}

/// Render a duration with the largest unit that divides it evenly
pub fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis();
    match millis {
        0 => "0s".to_string(),
        m if m % (60 * 60 * 1000) == 0 => format!("{}h", m / (60 * 60 * 1000)),
        m if m % (60 * 1000) == 0 => format!("{}m", m / (60 * 1000)),
        m if m % 1000 == 0 => format!("{}s", m / 1000),
        m => format!("{}ms", m),
    }
}

/// Accepts either a duration string or a plain integer number of seconds
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

pub fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
    }
}

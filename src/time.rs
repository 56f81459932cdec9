// src/time.rs
//! Timecode formatting, parsing and clamping for the timeline ruler and
//! transport display. Everything here is pure.

const SECONDS_PER_HOUR: u64 = 3600;

/// Formats seconds as `M:SS`, or `H:MM:SS` once the value reaches an hour.
/// Negative, NaN and infinite inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    let hours = total / SECONDS_PER_HOUR;
    let mins = (total % SECONDS_PER_HOUR) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Formats seconds as `M:SS.CC`. Centiseconds are truncated, not rounded.
pub fn format_time_with_ms(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00.00".to_string();
    }

    // The nudge keeps values like 0.29 from truncating to 28 centiseconds.
    let total_cs = (seconds * 100.0 + 1e-6).floor() as u64;
    let mins = total_cs / 6000;
    let secs = (total_cs % 6000) / 100;
    let cs = total_cs % 100;

    format!("{}:{:02}.{:02}", mins, secs, cs)
}

/// Parses `M:SS` or `H:MM:SS` (the last field may carry a fraction).
pub fn parse_time(text: &str) -> Option<f64> {
    let parts: Vec<f64> = text
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;

    if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return None;
    }

    match parts.as_slice() {
        [mins, secs] => Some(mins * 60.0 + secs),
        [hours, mins, secs] => Some(hours * 3600.0 + mins * 60.0 + secs),
        _ => None,
    }
}

/// Bounds `time` to `[min, max]`. NaN collapses to `min`.
pub fn clamp_time(time: f64, min: f64, max: f64) -> f64 {
    if time.is_nan() {
        return min;
    }
    min.max(time.min(max))
}

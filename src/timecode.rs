use crate::error::{Result, ConvkitError};

/// Parse `SS`, `MM:SS` or `HH:MM:SS` (seconds may be fractional) into seconds
pub fn parse_timecode(input: &str) -> Result<f64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ConvkitError::InvalidTimecode("Empty timecode".to_string()));
    }

    let invalid = || ConvkitError::InvalidTimecode(format!("Invalid time format: {}", s));
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();

    let whole = |part: &str| -> Result<u64> { part.parse::<u64>().map_err(|_| invalid()) };
    let seconds = |part: &str| -> Result<f64> {
        let value: f64 = part.parse().map_err(|_| invalid())?;
        if value.is_finite() && value >= 0.0 { Ok(value) } else { Err(invalid()) }
    };

    match parts.as_slice() {
        &[sec] => seconds(sec),
        &[min, sec] => Ok(whole(min)? as f64 * 60.0 + seconds(sec)?),
        &[hour, min, sec] => Ok(whole(hour)? as f64 * 3600.0 + whole(min)? as f64 * 60.0 + seconds(sec)?),
        _ => Err(invalid()),
    }
}

/// `HH:MM:SS` when the value reaches an hour, `MM:SS` otherwise
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Compact seconds rendering for file names: `30`, `45.5`
pub fn format_seconds(value: f64) -> String {
    let rendered = format!("{:.3}", value);
    rendered.trim_end_matches('0').trim_end_matches('.').to_string()
}

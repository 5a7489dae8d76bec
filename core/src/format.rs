//! Compact number and duration formatting for stat summaries.

use chrono::TimeDelta;

/// Format a magnitude with a K/M suffix for compact display.
pub fn format_magnitude(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{value:.2}")
    }
}

/// Format a duration as M:SS.
pub fn format_duration(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_suffixes() {
        assert_eq!(format_magnitude(500.0), "500.00");
        assert_eq!(format_magnitude(1_500.0), "1.50K");
        assert_eq!(format_magnitude(2_250_000.0), "2.25M");
        assert_eq!(format_magnitude(-1_500.0), "-1.50K");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(TimeDelta::seconds(0)), "0:00");
        assert_eq!(format_duration(TimeDelta::seconds(59)), "0:59");
        assert_eq!(format_duration(TimeDelta::seconds(125)), "2:05");
        assert_eq!(format_duration(TimeDelta::seconds(-3)), "0:00");
    }
}

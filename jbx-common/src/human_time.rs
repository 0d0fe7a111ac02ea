//! Human-readable duration formatting
//!
//! Provides the display strings stored alongside each song
//! (`M:SS` below one hour, `H:MM:SS` above).

/// Seconds threshold above which the hour field is shown
const HOUR_FORMAT_MIN: i64 = 3600;

/// Format a track duration in seconds for display.
///
/// # Examples
///
/// ```
/// use jbx_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45), "0:45");
/// assert_eq!(format_duration(330), "5:30");
/// assert_eq!(format_duration(3661), "1:01:01");
/// ```
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);

    if seconds >= HOUR_FORMAT_MIN {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let secs = seconds % 60;
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_minute() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(9), "0:09");
        assert_eq!(format_duration(59), "0:59");
    }

    #[test]
    fn test_minutes() {
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(330), "5:30");
        assert_eq!(format_duration(3599), "59:59");
    }

    #[test]
    fn test_hours() {
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3661), "1:01:01");
        assert_eq!(format_duration(7325), "2:02:05");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(format_duration(-5), "0:00");
    }
}

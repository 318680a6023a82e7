//! Human-readable link lifetimes.

use std::time::Duration;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Describe a remaining lifetime the way a person would say it.
///
/// Up to one and a half minutes is counted in seconds, up to one and a half
/// hours in minutes, below a day in hours, below a week in days, and in weeks
/// beyond that.
pub fn humanize_ttl(ttl: Duration) -> String {
    let seconds = ttl.as_secs_f64();

    if seconds == 1.0 {
        return "1 second".to_string();
    }
    if seconds <= 1.5 * MINUTE {
        return plural(seconds as i64, "second");
    }
    if seconds <= 1.5 * HOUR {
        return plural((seconds / MINUTE).round() as i64, "minute");
    }
    if seconds < DAY {
        return plural((seconds / HOUR).round() as i64, "hour");
    }
    if seconds == DAY {
        return "1 day".to_string();
    }
    if seconds < WEEK {
        return plural((seconds / DAY).round() as i64, "day");
    }
    plural((seconds / WEEK).round() as i64, "week")
}

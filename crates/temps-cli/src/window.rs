use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::WINDOW_START_HOUR;
use crate::model::TimeWindow;

/// Computes the "today so far" query window in the target timezone.
///
/// `start` is the local calendar date at the fixed start hour; `end` is the
/// local wall-clock time truncated to minutes. Before the start hour the end
/// bound sorts lexically before the start bound on the same calendar date;
/// the window is passed through as computed and the forecast service decides
/// what a zero- or negative-span query returns.
pub fn compute_window(now_utc: DateTime<Utc>, tz: Tz) -> TimeWindow {
    let local = now_utc.with_timezone(&tz);
    TimeWindow {
        start: format!("{}T{:02}:00", local.format("%Y-%m-%d"), WINDOW_START_HOUR),
        end: local.format("%Y-%m-%dT%H:%M").to_string(),
    }
}

//! Lookback window partitioning

use crate::models::TimeWindow;
use chrono::{DateTime, Duration, Utc};

/// Split `[now - days, now)` into consecutive one-day windows.
///
/// Window `i` covers `[now - (i + 1) days, now - i days)`, so window 0 is the
/// most recent day.
pub fn daily_windows(now: DateTime<Utc>, days: u32) -> Vec<TimeWindow> {
    (0..days)
        .map(|i| TimeWindow {
            index: i,
            start: now - Duration::days(i64::from(i) + 1),
            end: now - Duration::days(i64::from(i)),
        })
        .collect()
}

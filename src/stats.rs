//! Run statistics
//! Counters shared by the concurrent fetch tasks and the final run summary

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Thread-safe counters for one fetch pass
#[derive(Debug)]
pub struct FetchStats {
    windows_completed: AtomicU64,
    pages_read: AtomicU64,
    records_read: AtomicU64,
    malformed_records: AtomicU64,
    start_time: Instant,
}

impl FetchStats {
    pub fn new() -> Self {
        Self {
            windows_completed: AtomicU64::new(0),
            pages_read: AtomicU64::new(0),
            records_read: AtomicU64::new(0),
            malformed_records: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn count_window(&self) {
        self.windows_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one drained page and the records it held
    pub fn count_page(&self, records: usize) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
        self.records_read.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn count_malformed(&self, count: u64) {
        self.malformed_records.fetch_add(count, Ordering::Relaxed);
    }

    pub fn windows(&self) -> u64 {
        self.windows_completed.load(Ordering::Relaxed)
    }

    pub fn pages(&self) -> u64 {
        self.pages_read.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed_records.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one report run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub resource_groups: usize,
    pub indexed_accounts: usize,
    pub event_windows: u64,
    pub event_pages: u64,
    pub events_read: u64,
    pub malformed_events: u64,
    pub alert_windows: u64,
    pub alert_pages: u64,
    pub alerts_read: u64,
    pub unmatched_events: u64,
    pub rows: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// Share of extracted events that found their alert, as a percentage
    pub fn join_rate(&self) -> f64 {
        let extracted = self.events_read.saturating_sub(self.malformed_events);
        if extracted > 0 {
            (extracted.saturating_sub(self.unmatched_events) as f64 / extracted as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        info!("Report run finished in {:.2}s", self.duration.as_secs_f64());
        info!(
            "   Resource groups: {} ({} accounts indexed)",
            self.resource_groups, self.indexed_accounts
        );
        info!(
            "   Events: {} records in {} pages over {} windows ({} malformed)",
            self.events_read, self.event_pages, self.event_windows, self.malformed_events
        );
        info!(
            "   Alerts: {} records in {} pages over {} windows",
            self.alerts_read, self.alert_pages, self.alert_windows
        );
        info!(
            "   Join: {} events without alert ({:.1}% matched)",
            self.unmatched_events,
            self.join_rate()
        );
        info!("   Rows: {}", self.rows);
    }
}

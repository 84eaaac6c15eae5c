//! End-to-end report scenarios
//!
//! These tests drive `run_report_at` against an in-memory data source and sink,
//! covering attribution, the left join, fan-out, and failure propagation.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use futures::{stream, StreamExt};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use siem_rg_report::models::{AggregationRow, RawAlert, RawEvent, ResourceGroup, TimeWindow};
use siem_rg_report::report::ReportSink;
use siem_rg_report::source::{DataSource, PageStream};
use siem_rg_report::{run_report_at, ReportConfig, ReportError, ReportResult};

/// Data source serving fixed records, filtered by window
struct FixtureSource {
    groups: Vec<ResourceGroup>,
    events: Vec<(chrono::DateTime<Utc>, RawEvent)>,
    alerts: Vec<(chrono::DateTime<Utc>, RawAlert)>,
    failing_alert_window: Option<u32>,
    windows_seen: Mutex<Vec<TimeWindow>>,
}

impl FixtureSource {
    fn new(groups: Vec<ResourceGroup>) -> Self {
        Self {
            groups,
            events: Vec::new(),
            alerts: Vec::new(),
            failing_alert_window: None,
            windows_seen: Mutex::new(Vec::new()),
        }
    }
}

fn in_window<T: Clone>(records: &[(chrono::DateTime<Utc>, T)], window: &TimeWindow) -> Vec<T> {
    records
        .iter()
        .filter(|(at, _)| *at >= window.start && *at < window.end)
        .map(|(_, r)| r.clone())
        .collect()
}

#[async_trait]
impl DataSource for FixtureSource {
    async fn list_resource_groups(&self) -> ReportResult<Vec<ResourceGroup>> {
        Ok(self.groups.clone())
    }

    fn alert_pages(&self, window: &TimeWindow) -> PageStream<'_, RawAlert> {
        self.windows_seen.lock().unwrap().push(*window);
        if Some(window.index) == self.failing_alert_window {
            return stream::iter(vec![Err(ReportError::upstream(503, "unavailable"))]).boxed();
        }
        stream::iter(vec![Ok(in_window(&self.alerts, window))]).boxed()
    }

    fn event_pages(&self, window: &TimeWindow) -> PageStream<'_, RawEvent> {
        self.windows_seen.lock().unwrap().push(*window);
        // one record per page to exercise draining
        let pages: Vec<ReportResult<Vec<RawEvent>>> = in_window(&self.events, window)
            .into_iter()
            .map(|e| Ok(vec![e]))
            .collect();
        stream::iter(pages).boxed()
    }

    async fn client_identifier(&self) -> ReportResult<String> {
        Ok("acme".to_string())
    }
}

/// Sink capturing what it was asked to write
#[derive(Default)]
struct MemorySink {
    written: Mutex<Vec<(String, Vec<AggregationRow>)>>,
}

impl ReportSink for MemorySink {
    fn write(&self, rows: &[AggregationRow], file_name: &str) -> ReportResult<PathBuf> {
        self.written
            .lock()
            .unwrap()
            .push((file_name.to_string(), rows.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}

struct FailingSink;

impl ReportSink for FailingSink {
    fn write(&self, _rows: &[AggregationRow], _file_name: &str) -> ReportResult<PathBuf> {
        Err(ReportError::output_with_source(
            "disk full",
            anyhow::anyhow!("no space left on device"),
        ))
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn config(days: u32) -> ReportConfig {
    ReportConfig {
        lookback_days: days,
        max_threads: 2,
    }
}

fn event(account: &str, id: &str) -> RawEvent {
    RawEvent(json!({ "id": id, "srcEvent": { "accountId": account } }))
}

#[tokio::test]
async fn test_mapped_account_single_row() {
    let mut source = FixtureSource::new(vec![ResourceGroup::aws("rg-prod", &["111"])]);
    source.events.push((now() - Duration::hours(1), event("111", "a1")));
    source.alerts.push((now() - Duration::hours(1), RawAlert::new("a1", "High")));

    let sink = MemorySink::default();
    let run = run_report_at(Arc::new(source), &config(1), &sink, now())
        .await
        .unwrap();

    assert_eq!(run.rows, vec![AggregationRow::new("rg-prod", "High", 1)]);
    assert_eq!(
        run.report_path,
        PathBuf::from("acme_resource_groups_2024-06-01_12.00.00.xlsx")
    );

    let written = sink.written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].1, run.rows);
}

#[tokio::test]
async fn test_unmapped_account_reports_sentinel_group() {
    let mut source = FixtureSource::new(vec![ResourceGroup::aws("rg-prod", &["111"])]);
    source.events.push((now() - Duration::hours(1), event("999", "a1")));
    source.alerts.push((now() - Duration::hours(1), RawAlert::new("a1", "High")));

    let run = run_report_at(Arc::new(source), &config(1), &MemorySink::default(), now())
        .await
        .unwrap();

    assert_eq!(run.rows, vec![AggregationRow::new("N/A", "High", 1)]);
}

#[tokio::test]
async fn test_missing_alert_keeps_event_with_unknown_severity() {
    let mut source = FixtureSource::new(vec![ResourceGroup::aws("rg-prod", &["111"])]);
    source.events.push((now() - Duration::hours(1), event("111", "a2")));

    let run = run_report_at(Arc::new(source), &config(1), &MemorySink::default(), now())
        .await
        .unwrap();

    assert_eq!(run.rows, vec![AggregationRow::new("rg-prod", "Unknown", 1)]);
    assert_eq!(run.summary.unmatched_events, 1);
}

#[tokio::test]
async fn test_multi_day_fan_out_and_malformed_records() {
    let mut source = FixtureSource::new(vec![
        ResourceGroup::aws("rg-prod", &["111", "222"]),
        ResourceGroup::aws("rg-shared", &["222"]),
        ResourceGroup {
            resource_type: "GCP".to_string(),
            ..ResourceGroup::aws("rg-gcp", &["111"])
        },
    ]);
    let day = Duration::days(1);
    source.events.push((now() - Duration::hours(2), event("111", "a1")));
    source.events.push((now() - day - Duration::hours(2), event("222", "a2")));
    source.events.push((now() - day * 2 - Duration::hours(2), event("222", "a3")));
    source
        .events
        .push((now() - Duration::hours(3), RawEvent(json!({ "srcEvent": "broken" }))));
    // outside the lookback period
    source.events.push((now() - day * 5, event("111", "a9")));

    source.alerts.push((now() - Duration::hours(2), RawAlert::new("a1", "Low")));
    source.alerts.push((now() - day - Duration::hours(2), RawAlert::new("a2", "High")));
    source.alerts.push((now() - day * 2 - Duration::hours(2), RawAlert::new("a3", "High")));

    let source = Arc::new(source);
    let run = run_report_at(Arc::clone(&source), &config(3), &MemorySink::default(), now())
        .await
        .unwrap();

    assert_eq!(
        run.rows,
        vec![
            AggregationRow::new("rg-prod", "High", 2),
            AggregationRow::new("rg-prod", "Low", 1),
            AggregationRow::new("rg-shared", "High", 2),
        ]
    );
    assert_eq!(run.summary.malformed_events, 1);
    assert_eq!(run.summary.events_read, 4);
    assert_eq!(run.summary.event_windows, 3);
    assert_eq!(run.summary.alert_windows, 3);
    assert_eq!(run.summary.indexed_accounts, 2);
}

#[tokio::test]
async fn test_both_passes_share_the_same_windows() {
    let source = Arc::new(FixtureSource::new(Vec::new()));
    run_report_at(Arc::clone(&source), &config(4), &MemorySink::default(), now())
        .await
        .unwrap();

    let seen = source.windows_seen.lock().unwrap();
    assert_eq!(seen.len(), 8);

    let mut events_pass: Vec<TimeWindow> = seen[..4].to_vec();
    let mut alerts_pass: Vec<TimeWindow> = seen[4..].to_vec();
    events_pass.sort_by_key(|w| w.index);
    alerts_pass.sort_by_key(|w| w.index);
    assert_eq!(events_pass, alerts_pass);
    assert_eq!(events_pass[0].end, now());
}

#[tokio::test]
async fn test_failed_alert_window_aborts_run() {
    let mut source = FixtureSource::new(vec![ResourceGroup::aws("rg-prod", &["111"])]);
    source.events.push((now() - Duration::hours(1), event("111", "a1")));
    source.failing_alert_window = Some(1);

    let sink = MemorySink::default();
    let err = run_report_at(Arc::new(source), &config(3), &sink, now())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Upstream { status: 503, .. }));
    assert!(sink.written.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sink_failure_is_fatal() {
    let source = FixtureSource::new(Vec::new());
    let err = run_report_at(Arc::new(source), &config(1), &FailingSink, now())
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "OUTPUT_ERROR");
}

#[tokio::test]
async fn test_invalid_config_rejected_before_fetching() {
    let source = Arc::new(FixtureSource::new(Vec::new()));
    let err = run_report_at(Arc::clone(&source), &config(0), &MemorySink::default(), now())
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(source.windows_seen.lock().unwrap().is_empty());
}

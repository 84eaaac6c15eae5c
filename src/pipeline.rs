//! One batch report run
//!
//! Both fetch passes use windows derived from a single pinned `now`, so an
//! event and its alert always fall into matching day windows.

use crate::aggregator::aggregate;
use crate::config::ReportConfig;
use crate::error_handling::ReportResult;
use crate::fetcher::WindowedFetcher;
use crate::models::AggregationRow;
use crate::report::{report_file_name, ReportSink};
use crate::resource_groups::ResourceGroupIndex;
use crate::source::DataSource;
use crate::stats::{FetchStats, RunSummary};
use crate::windowing::daily_windows;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct ReportRun {
    pub rows: Vec<AggregationRow>,
    pub report_path: PathBuf,
    pub summary: RunSummary,
}

/// Run the report with the current time as the end of the lookback period
pub async fn run_report<S>(
    source: Arc<S>,
    config: &ReportConfig,
    sink: &dyn ReportSink,
) -> ReportResult<ReportRun>
where
    S: DataSource + ?Sized + 'static,
{
    run_report_at(source, config, sink, Utc::now()).await
}

/// Run the report for the lookback period ending at `now`
pub async fn run_report_at<S>(
    source: Arc<S>,
    config: &ReportConfig,
    sink: &dyn ReportSink,
    now: DateTime<Utc>,
) -> ReportResult<ReportRun>
where
    S: DataSource + ?Sized + 'static,
{
    config.validate()?;
    let started = Instant::now();
    info!("Starting report run: {}", config);

    let groups = source.list_resource_groups().await?;
    let index = Arc::new(ResourceGroupIndex::build(&groups));

    let windows = daily_windows(now, config.lookback_days);
    let fetcher = WindowedFetcher::new(config.max_threads);

    let event_stats = Arc::new(FetchStats::new());
    let events = fetcher
        .fetch_events(
            Arc::clone(&source),
            &windows,
            Arc::clone(&index),
            Arc::clone(&event_stats),
        )
        .await?;
    info!(
        "Fetched {} events in {:.2}s",
        events.len(),
        event_stats.elapsed().as_secs_f64()
    );

    let alert_stats = Arc::new(FetchStats::new());
    let alerts = fetcher
        .fetch_alerts(Arc::clone(&source), &windows, Arc::clone(&alert_stats))
        .await?;
    info!(
        "Fetched {} alerts in {:.2}s",
        alerts.len(),
        alert_stats.elapsed().as_secs_f64()
    );

    let aggregation = aggregate(&events, &alerts);

    let client = source.client_identifier().await?;
    let file_name = report_file_name(&client, now);
    let report_path = sink.write(&aggregation.rows, &file_name)?;

    let summary = RunSummary {
        resource_groups: groups.len(),
        indexed_accounts: index.len(),
        event_windows: event_stats.windows(),
        event_pages: event_stats.pages(),
        events_read: event_stats.records(),
        malformed_events: event_stats.malformed(),
        alert_windows: alert_stats.windows(),
        alert_pages: alert_stats.pages(),
        alerts_read: alert_stats.records(),
        unmatched_events: aggregation.unmatched_events,
        rows: aggregation.rows.len(),
        duration: started.elapsed(),
    };
    summary.log();

    Ok(ReportRun {
        rows: aggregation.rows,
        report_path,
        summary,
    })
}

//! Windowed parallel fetcher
//!
//! Every daily window becomes its own task. A semaphore shared by both fetch
//! passes caps the number of window queries in flight. The fetcher always waits
//! for every task before returning, and any failed window fails the whole pass.

use crate::error_handling::{ReportError, ReportResult};
use crate::extractor::extract_events;
use crate::models::{ExtractedEvent, RawAlert, TimeWindow};
use crate::resource_groups::ResourceGroupIndex;
use crate::source::{DataSource, PageStream};
use crate::stats::FetchStats;
use futures::{future, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Bounded executor for per-window fetch tasks
#[derive(Debug, Clone)]
pub struct WindowedFetcher {
    max_in_flight: usize,
    permits: Arc<Semaphore>,
}

impl WindowedFetcher {
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            max_in_flight,
            permits: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Run `task` once per window and concatenate the results.
    ///
    /// Result order is unspecified. The first error observed is returned once
    /// all tasks have finished.
    pub async fn run<T, F, Fut>(&self, windows: &[TimeWindow], task: F) -> ReportResult<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(TimeWindow) -> Fut,
        Fut: Future<Output = ReportResult<Vec<T>>> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(windows.len());

        for window in windows {
            let permits = Arc::clone(&self.permits);
            let query = task(*window);

            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    ReportError::internal_with_source("Fetch executor closed", e.into())
                })?;
                query.await
            });

            handles.push((window.index, handle));
        }

        let mut results = Vec::new();
        let mut first_error = None;
        let mut failed = 0usize;

        for (index, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ReportError::internal_with_source(
                    format!("Fetch task for window {} did not complete", index),
                    e.into(),
                )),
            };

            match outcome {
                Ok(items) => results.extend(items),
                Err(e) => {
                    failed += 1;
                    error!("Window {} failed: {}", index, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => {
                error!("{} of {} windows failed, aborting fetch", failed, windows.len());
                Err(e)
            }
            None => Ok(results),
        }
    }

    /// Fetch every alert raised inside `windows`
    pub async fn fetch_alerts<S>(
        &self,
        source: Arc<S>,
        windows: &[TimeWindow],
        stats: Arc<FetchStats>,
    ) -> ReportResult<Vec<RawAlert>>
    where
        S: DataSource + ?Sized + 'static,
    {
        self.run(windows, move |window| {
            let source = Arc::clone(&source);
            let stats = Arc::clone(&stats);
            async move {
                info!(
                    "Getting alerts: [{}] start: {} end: {}",
                    window.index, window.start, window.end
                );
                let alerts = drain_pages(source.alert_pages(&window), &stats).await?;
                stats.count_window();
                debug!("Window {} returned {} alerts", window.index, alerts.len());
                Ok(alerts)
            }
        })
        .await
    }

    /// Fetch every event inside `windows` and attribute it against `index`.
    ///
    /// Malformed records are skipped and counted; they never fail the window.
    pub async fn fetch_events<S>(
        &self,
        source: Arc<S>,
        windows: &[TimeWindow],
        index: Arc<ResourceGroupIndex>,
        stats: Arc<FetchStats>,
    ) -> ReportResult<Vec<ExtractedEvent>>
    where
        S: DataSource + ?Sized + 'static,
    {
        self.run(windows, move |window| {
            let source = Arc::clone(&source);
            let index = Arc::clone(&index);
            let stats = Arc::clone(&stats);
            async move {
                info!(
                    "Getting events: [{}] start: {} end: {}",
                    window.index, window.start, window.end
                );
                let raw = drain_pages(source.event_pages(&window), &stats).await?;
                let (extracted, skipped) = extract_events(&raw, &index);
                stats.count_malformed(skipped);
                stats.count_window();
                debug!(
                    "Window {} returned {} events ({} skipped)",
                    window.index,
                    extracted.len(),
                    skipped
                );
                Ok(extracted)
            }
        })
        .await
    }
}

/// Drain every page of a query into one sequence
pub async fn drain_pages<T>(pages: PageStream<'_, T>, stats: &FetchStats) -> ReportResult<Vec<T>> {
    pages
        .try_fold(Vec::new(), |mut acc, page| {
            stats.count_page(page.len());
            acc.extend(page);
            future::ready(Ok(acc))
        })
        .await
}

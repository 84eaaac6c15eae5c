//! Upstream data source seam
//!
//! The fetcher and pipeline only talk to the vendor through [`DataSource`].
//! Nothing behind this trait is retried; a caller that wants retries or rate
//! limiting wraps an implementation in its own `DataSource`.

use crate::error_handling::ReportResult;
use crate::models::{RawAlert, RawEvent, ResourceGroup, TimeWindow};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, finite, non-restartable sequence of result pages
pub type PageStream<'a, T> = BoxStream<'a, ReportResult<Vec<T>>>;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// List every resource group definition
    async fn list_resource_groups(&self) -> ReportResult<Vec<ResourceGroup>>;

    /// Pages of alerts raised inside `window`
    fn alert_pages(&self, window: &TimeWindow) -> PageStream<'_, RawAlert>;

    /// Pages of events recorded inside `window`
    fn event_pages(&self, window: &TimeWindow) -> PageStream<'_, RawEvent>;

    /// Short client identifier used to name the report file
    async fn client_identifier(&self) -> ReportResult<String>;
}

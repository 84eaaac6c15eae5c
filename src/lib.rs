//! SIEM Resource Group Report Library
//!
//! Pulls alerts and audit events for a lookback period from the Lacework API,
//! attributes every event to the cloud resource groups owning its account, and
//! counts them per resource group and severity.
//!
//! # Modules
//!
//! - `resource_groups`: account to resource group index
//! - `extractor`: owning account of an event and its resource groups
//! - `fetcher`: bounded parallel fetch of daily windows
//! - `aggregator`: left join to alert severities and group counts
//! - `lacework_client`: HTTP implementation of the `DataSource` seam
//! - `report`: xlsx output and console table
//! - `pipeline`: one complete report run

pub mod aggregator;
pub mod config;
pub mod error_handling;
pub mod extractor;
pub mod fetcher;
pub mod lacework_client;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod resource_groups;
pub mod source;
pub mod stats;
pub mod windowing;

// Re-export the main types for convenience
pub use aggregator::{aggregate, Aggregation};
pub use config::{Args, Credentials, LoggingConfig, ReportConfig};
pub use error_handling::{ReportError, ReportResult};
pub use extractor::extract_event;
pub use fetcher::WindowedFetcher;
pub use lacework_client::LaceworkClient;
pub use models::{AggregationRow, ExtractedEvent, RawAlert, RawEvent, ResourceGroup, TimeWindow};
pub use pipeline::{run_report, run_report_at, ReportRun};
pub use report::{ReportSink, XlsxReportWriter};
pub use resource_groups::ResourceGroupIndex;
pub use source::{DataSource, PageStream};

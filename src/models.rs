//! Report data model
//!
//! Vendor records (`RawEvent`, `RawAlert`, `ResourceGroup`) are deserialized as
//! loosely as possible: the vendor schema varies between record types, so only
//! the fields the report needs are typed and everything else stays opaque.
//! Derived records (`ExtractedEvent`, `AggregationRow`) are owned and immutable
//! once produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel used when an account or resource group cannot be determined
pub const NOT_AVAILABLE: &str = "N/A";

/// Severity reported for events whose alert was never fetched
pub const UNKNOWN_SEVERITY: &str = "Unknown";

/// Resource group type tag for AWS account groups
pub const AWS_RESOURCE_TYPE: &str = "AWS";

/// Timestamp layout expected by the search endpoints
pub const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Resource group definition as listed by the vendor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub resource_name: String,

    #[serde(default)]
    pub resource_type: String,

    /// Structured group properties
    #[serde(default)]
    pub props_json: Option<Value>,

    /// Group properties as returned by newer API versions
    #[serde(default)]
    pub props: Option<Value>,
}

impl ResourceGroup {
    /// AWS group owning the given accounts
    pub fn aws(name: &str, account_ids: &[&str]) -> Self {
        Self {
            resource_name: name.to_string(),
            resource_type: AWS_RESOURCE_TYPE.to_string(),
            props_json: Some(serde_json::json!({ "accountIds": account_ids })),
            props: None,
        }
    }

    pub fn is_aws(&self) -> bool {
        self.resource_type == AWS_RESOURCE_TYPE
    }

    /// Member account identifiers, empty when the group lists none
    pub fn account_ids(&self) -> Vec<String> {
        [&self.props_json, &self.props]
            .into_iter()
            .flatten()
            .find_map(|props| props.get("accountIds").and_then(Value::as_array))
            .map(|ids| {
                ids.iter()
                    .filter(|id| id.is_string() || id.is_number())
                    .filter_map(scalar_to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Opaque audit event record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RawEvent(pub Value);

impl RawEvent {
    /// Nested source event, if present
    pub fn src_event(&self) -> Option<&Value> {
        self.0.get("srcEvent")
    }

    /// Top-level event identifier, shared with the alert it raised
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }
}

/// Alert record; the alerts query only returns `alertId` and `severity`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawAlert {
    #[serde(default)]
    pub alert_id: Option<Value>,

    #[serde(default)]
    pub severity: Option<Value>,
}

impl RawAlert {
    pub fn new(alert_id: &str, severity: &str) -> Self {
        Self {
            alert_id: Some(Value::String(alert_id.to_string())),
            severity: Some(Value::String(severity.to_string())),
        }
    }

    /// Join key, normalized the same way as event ids
    pub fn join_key(&self) -> Option<String> {
        self.alert_id.as_ref().and_then(scalar_to_string)
    }

    pub fn severity_label(&self) -> String {
        self.severity
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string())
    }
}

/// Event attributed to its account and resource groups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEvent {
    /// Owning account, `N/A` when undeterminable
    pub account: String,
    pub alert_id: String,
    /// Never empty: `["N/A"]` when the account maps to no group
    pub resource_groups: Vec<String>,
}

/// One output row of the report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRow {
    pub resource_group: String,
    pub severity: String,
    pub number: u64,
}

impl AggregationRow {
    pub fn new(resource_group: &str, severity: &str, number: u64) -> Self {
        Self {
            resource_group: resource_group.to_string(),
            severity: severity.to_string(),
            number,
        }
    }
}

/// Half-open time range `[start, end)` queried by one fetch task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub index: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `timeFilter` object of a search request
    pub fn time_filter(&self) -> Value {
        serde_json::json!({
            "startTime": self.start.format(QUERY_TIME_FORMAT).to_string(),
            "endTime": self.end.format(QUERY_TIME_FORMAT).to_string(),
        })
    }
}

/// Envelope of one page returned by a search or listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default)]
    pub rows: Option<u64>,

    #[serde(default)]
    pub total_rows: Option<u64>,

    #[serde(default)]
    pub urls: Option<PagingUrls>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingUrls {
    #[serde(default)]
    pub next_page: Option<String>,
}

impl<T> SearchPage<T> {
    pub fn next_page(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.urls.as_ref())
            .and_then(|u| u.next_page.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// Render a scalar JSON value as a string key.
///
/// `null` renders as the empty string; objects and arrays have no key form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

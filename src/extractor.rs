//! Event account extraction
//!
//! Vendor events carry the owning account under different field names depending
//! on the event source. The candidates are tried in a fixed order and the first
//! field that is present wins, whatever its value.

use crate::error_handling::{ReportError, ReportResult};
use crate::models::{scalar_to_string, ExtractedEvent, RawEvent, NOT_AVAILABLE};
use crate::resource_groups::ResourceGroupIndex;
use serde_json::{Map, Value};
use tracing::warn;

/// Accessor over the `srcEvent` object; `None` means the field is absent
pub type AccountAccessor = fn(&Map<String, Value>) -> Option<&Value>;

/// Account fields in priority order
pub const ACCOUNT_EXTRACTORS: &[(&str, AccountAccessor)] = &[
    ("recipientAccountId", recipient_account_id),
    ("accountId", account_id_camel),
    ("account_id", account_id_snake),
    ("Id", generic_id),
    ("accountcallee", account_callee),
];

// CloudTrail management events
fn recipient_account_id(src: &Map<String, Value>) -> Option<&Value> {
    src.get("recipientAccountId")
}

fn account_id_camel(src: &Map<String, Value>) -> Option<&Value> {
    src.get("accountId")
}

fn account_id_snake(src: &Map<String, Value>) -> Option<&Value> {
    src.get("account_id")
}

fn generic_id(src: &Map<String, Value>) -> Option<&Value> {
    src.get("Id")
}

fn account_callee(src: &Map<String, Value>) -> Option<&Value> {
    src.get("accountcallee")
}

/// Resolve the owning account of an event.
///
/// Returns the label of the matching field with the account, `None` when no
/// candidate field is present.
pub fn resolve_account(event: &RawEvent) -> ReportResult<Option<(&'static str, String)>> {
    let src = match event.src_event() {
        None => return Ok(None),
        Some(Value::Object(src)) => src,
        Some(_) => {
            return Err(ReportError::malformed_field(
                "srcEvent is not an object",
                "srcEvent",
            ))
        }
    };

    for (label, accessor) in ACCOUNT_EXTRACTORS {
        if let Some(value) = accessor(src) {
            let account = scalar_to_string(value).ok_or_else(|| {
                ReportError::malformed_field(
                    format!("srcEvent.{} is not a scalar", label),
                    format!("srcEvent.{}", label),
                )
            })?;
            return Ok(Some((*label, account)));
        }
    }

    Ok(None)
}

/// Attribute one raw event to its account and resource groups
pub fn extract_event(event: &RawEvent, index: &ResourceGroupIndex) -> ReportResult<ExtractedEvent> {
    let alert_id = event
        .id()
        .and_then(|id| match id {
            Value::String(_) | Value::Number(_) => scalar_to_string(id),
            _ => None,
        })
        .ok_or_else(|| ReportError::malformed_field("event has no usable id", "id"))?;

    let account = resolve_account(event)?
        .map(|(_, account)| account)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let resource_groups = index.attribute(&account);

    Ok(ExtractedEvent {
        account,
        alert_id,
        resource_groups,
    })
}

/// Extract a batch, skipping malformed records.
///
/// Returns the extracted events and the number of records skipped.
pub fn extract_events(events: &[RawEvent], index: &ResourceGroupIndex) -> (Vec<ExtractedEvent>, u64) {
    let mut extracted = Vec::with_capacity(events.len());
    let mut skipped = 0u64;

    for event in events {
        match extract_event(event, index) {
            Ok(e) => extracted.push(e),
            Err(e) => {
                skipped += 1;
                warn!("Skipping event record: {}", e);
            }
        }
    }

    (extracted, skipped)
}

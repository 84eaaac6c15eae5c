//! Join events to alert severities and count per resource group

use crate::models::{AggregationRow, ExtractedEvent, RawAlert, UNKNOWN_SEVERITY};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One pre-aggregation row: an event attributed to a single resource group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow<'a> {
    pub resource_group: &'a str,
    pub alert_id: &'a str,
    pub severity: &'a str,
}

/// Severity lookup keyed by alert id.
///
/// The first occurrence of an alert id wins, so an alert returned by two
/// windows never doubles its events.
#[derive(Debug, Default)]
pub struct SeverityIndex {
    severities: HashMap<String, String>,
}

impl SeverityIndex {
    pub fn build(alerts: &[RawAlert]) -> Self {
        let mut severities = HashMap::with_capacity(alerts.len());
        for alert in alerts {
            if let Some(key) = alert.join_key() {
                severities
                    .entry(key)
                    .or_insert_with(|| alert.severity_label());
            }
        }
        Self { severities }
    }

    pub fn severity_of(&self, alert_id: &str) -> Option<&str> {
        self.severities.get(alert_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.severities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.severities.is_empty()
    }
}

/// Fan an event out to one row per resource group, left-joined to its severity
pub fn fan_out<'a>(
    event: &'a ExtractedEvent,
    severities: &'a SeverityIndex,
) -> impl Iterator<Item = JoinedRow<'a>> + 'a {
    let severity = severities
        .severity_of(&event.alert_id)
        .unwrap_or(UNKNOWN_SEVERITY);

    event.resource_groups.iter().map(move |group| JoinedRow {
        resource_group: group,
        alert_id: &event.alert_id,
        severity,
    })
}

/// Result of aggregating one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub rows: Vec<AggregationRow>,
    /// Events whose alert id matched no fetched alert
    pub unmatched_events: u64,
}

/// Count joined rows per `(resource group, severity)`, sorted by both keys
pub fn aggregate(events: &[ExtractedEvent], alerts: &[RawAlert]) -> Aggregation {
    let severities = SeverityIndex::build(alerts);
    let mut counts: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    let mut unmatched_events = 0u64;

    for event in events {
        if severities.severity_of(&event.alert_id).is_none() {
            unmatched_events += 1;
        }
        for row in fan_out(event, &severities) {
            *counts.entry((row.resource_group, row.severity)).or_insert(0) += 1;
        }
    }

    debug!(
        "Aggregated {} events against {} alerts into {} groups",
        events.len(),
        severities.len(),
        counts.len()
    );

    let rows = counts
        .into_iter()
        .map(|((group, severity), number)| AggregationRow::new(group, severity, number))
        .collect();

    Aggregation {
        rows,
        unmatched_events,
    }
}

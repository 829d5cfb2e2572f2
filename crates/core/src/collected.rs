//! Durable per-session data: the partially-filled booking record and the
//! per-flow retry counters.
//!
//! `CollectedData` is the source of truth the state inferencer re-projects
//! from each turn. Field presence is expected to follow booking order:
//! a filled field implies all logically prior fields are filled too.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the conversation has gathered so far. All fields optional
/// until filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// ISO date, e.g. "2025-01-20"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// 24h time, e.g. "14:30"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_number: Option<String>,
}

impl CollectedData {
    pub fn is_empty(&self) -> bool {
        *self == CollectedData::default()
    }

    /// Whether every field needed to create an appointment is present.
    pub fn booking_fields_complete(&self) -> bool {
        self.service_id.is_some()
            && self.date.is_some()
            && self.start_time.is_some()
            && self.client_name.is_some()
            && self.client_email.is_some()
            && self.client_phone.is_some()
    }

    /// Merge a partial update into this record. `Some` fields in `update`
    /// win; `None` fields leave existing values untouched.
    pub fn merge(&mut self, update: CollectedData) {
        macro_rules! take {
            ($field:ident) => {
                if update.$field.is_some() {
                    self.$field = update.$field;
                }
            };
        }
        take!(service_id);
        take!(service_name);
        take!(date);
        take!(start_time);
        take!(end_time);
        take!(client_name);
        take!(client_email);
        take!(client_phone);
        take!(confirmation_number);
    }
}

/// Per-flow verification attempt counters.
///
/// Monotonic within a session: counters are incremented, never decremented,
/// and saturate at the escalation threshold so post-escalation errors cannot
/// grow them further.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounts(pub HashMap<String, u32>);

/// Attempt count at which a verification flow escalates.
pub const ESCALATION_THRESHOLD: u32 = 2;

impl RetryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, flow_key: &str) -> u32 {
        self.0.get(flow_key).copied().unwrap_or(0)
    }

    /// Increment the counter for a flow, saturating at the escalation
    /// threshold. Returns the new value.
    pub fn increment(&mut self, flow_key: &str) -> u32 {
        let entry = self.0.entry(flow_key.to_string()).or_insert(0);
        if *entry < ESCALATION_THRESHOLD {
            *entry += 1;
        }
        *entry
    }

    /// Whether the flow has exhausted its retry budget.
    pub fn exhausted(&self, flow_key: &str) -> bool {
        self.get(flow_key) >= ESCALATION_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(CollectedData::default().is_empty());
    }

    #[test]
    fn booking_completeness() {
        let mut data = CollectedData {
            service_id: Some("srv-001".into()),
            date: Some("2025-01-20".into()),
            start_time: Some("10:00".into()),
            client_name: Some("Dana".into()),
            client_email: Some("dana@example.com".into()),
            ..Default::default()
        };
        assert!(!data.booking_fields_complete());
        data.client_phone = Some("+15550100".into());
        assert!(data.booking_fields_complete());
    }

    #[test]
    fn merge_keeps_existing_when_update_is_none() {
        let mut base = CollectedData {
            service_id: Some("srv-001".into()),
            date: Some("2025-01-20".into()),
            ..Default::default()
        };
        base.merge(CollectedData {
            start_time: Some("10:00".into()),
            ..Default::default()
        });
        assert_eq!(base.service_id.as_deref(), Some("srv-001"));
        assert_eq!(base.start_time.as_deref(), Some("10:00"));
    }

    #[test]
    fn retry_counts_increment_and_saturate() {
        let mut counts = RetryCounts::new();
        assert_eq!(counts.get("cancel"), 0);
        assert_eq!(counts.increment("cancel"), 1);
        assert!(!counts.exhausted("cancel"));
        assert_eq!(counts.increment("cancel"), 2);
        assert!(counts.exhausted("cancel"));
        // Saturates at the threshold
        assert_eq!(counts.increment("cancel"), 2);
        assert_eq!(counts.get("reschedule"), 0);
    }
}

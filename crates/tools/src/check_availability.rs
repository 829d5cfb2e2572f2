//! Check open slots for a service. Results are cached briefly so repeated
//! lookups within a turn do not hammer the booking API.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use bookline_core::tool::{Tool, ToolReply};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::BoundedCache;
use crate::store::AppointmentStore;

const CACHE_CAPACITY: usize = 64;
const CACHE_TTL: Duration = Duration::from_secs(30);

pub struct CheckAvailabilityTool {
    store: Arc<dyn AppointmentStore>,
    cache: BoundedCache<String, String>,
}

impl CheckAvailabilityTool {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            store,
            cache: BoundedCache::new(CACHE_CAPACITY, CACHE_TTL),
        }
    }
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &str {
        "check_availability"
    }

    fn description(&self) -> &str {
        "Fetch open appointment slots for a service, optionally from a given date onward."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "service_id": {
                    "type": "string",
                    "description": "The service id, e.g. srv-001"
                },
                "date_from": {
                    "type": "string",
                    "description": "Earliest date to include, YYYY-MM-DD"
                }
            },
            "required": ["service_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolReply, ToolError> {
        let service_id = arguments["service_id"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'service_id' argument".into()))?;
        let date_from = arguments["date_from"].as_str();

        let key = format!("{service_id}|{}", date_from.unwrap_or(""));
        if let Some(cached) = self.cache.get(&key) {
            return Ok(ToolReply::success("", cached));
        }

        let response = self.store.availability(service_id, date_from).await?;
        if !response.success {
            let reason = response.error.unwrap_or_else(|| "unknown error".into());
            return Ok(ToolReply::error("", reason));
        }

        let slots = response.data.unwrap_or_default();
        let output = if slots.is_empty() {
            format!("No open slots for {service_id}. Suggest the customer try another date.")
        } else {
            let lines: Vec<String> = slots
                .iter()
                .map(|s| format!("- {} {}-{}", s.date, s.start_time, s.end_time))
                .collect();
            format!("Open slots for {service_id}:\n{}", lines.join("\n"))
        };
        self.cache.insert(key, output.clone());
        Ok(ToolReply::success("", output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockAppointmentStore;

    #[tokio::test]
    async fn returns_slots_for_known_service() {
        let tool = CheckAvailabilityTool::new(Arc::new(MockAppointmentStore::new()));
        let reply = tool
            .execute(serde_json::json!({"service_id": "srv-001"}))
            .await
            .unwrap();
        assert!(reply.render().contains("2026-09-01 10:00-10:30"));
    }

    #[tokio::test]
    async fn unknown_service_is_an_error_reply() {
        let tool = CheckAvailabilityTool::new(Arc::new(MockAppointmentStore::new()));
        let reply = tool
            .execute(serde_json::json!({"service_id": "srv-999"}))
            .await
            .unwrap();
        assert!(reply.render().starts_with("[ERROR] Service not found"));
    }

    #[tokio::test]
    async fn missing_service_id_is_invalid_arguments() {
        let tool = CheckAvailabilityTool::new(Arc::new(MockAppointmentStore::new()));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let store = Arc::new(MockAppointmentStore::new());
        let tool = CheckAvailabilityTool::new(store.clone());
        let first = tool
            .execute(serde_json::json!({"service_id": "srv-001"}))
            .await
            .unwrap();

        // The store going away does not affect a cached lookup
        store.set_offline(true);
        let second = tool
            .execute(serde_json::json!({"service_id": "srv-001"}))
            .await
            .unwrap();
        assert_eq!(first.render(), second.render());
    }
}

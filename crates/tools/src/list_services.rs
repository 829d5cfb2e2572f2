//! List the services the business offers.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use bookline_core::tool::{Tool, ToolReply};
use std::sync::Arc;

use crate::store::AppointmentStore;

pub struct ListServicesTool {
    store: Arc<dyn AppointmentStore>,
}

impl ListServicesTool {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListServicesTool {
    fn name(&self) -> &str {
        "list_services"
    }

    fn description(&self) -> &str {
        "List all services the business offers, with ids and durations. Call this before asking the customer to pick a service."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolReply, ToolError> {
        let response = self.store.list_services().await?;
        if !response.success {
            let reason = response.error.unwrap_or_else(|| "unknown error".into());
            return Ok(ToolReply::error("", reason));
        }
        let services = response.data.unwrap_or_default();
        if services.is_empty() {
            return Ok(ToolReply::success("", "No services are currently offered."));
        }
        let lines: Vec<String> = services
            .iter()
            .map(|s| format!("- {} (id: {}, {} min)", s.name, s.id, s.duration_minutes))
            .collect();
        Ok(ToolReply::success(
            "",
            format!("Available services:\n{}", lines.join("\n")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockAppointmentStore;

    #[tokio::test]
    async fn lists_canned_services() {
        let tool = ListServicesTool::new(Arc::new(MockAppointmentStore::new()));
        let reply = tool.execute(serde_json::json!({})).await.unwrap();
        let rendered = reply.render();
        assert!(rendered.starts_with("[SUCCESS]"));
        assert!(rendered.contains("Haircut"));
        assert!(rendered.contains("srv-002"));
    }

    #[tokio::test]
    async fn offline_store_propagates_as_tool_error() {
        let store = Arc::new(MockAppointmentStore::new());
        store.set_offline(true);
        let tool = ListServicesTool::new(store);
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream { .. }));
    }
}

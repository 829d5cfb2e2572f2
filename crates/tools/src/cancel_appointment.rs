//! Cancel an appointment by confirmation number. Mutating; never retried.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use bookline_core::tool::{Tool, ToolReply};
use std::sync::Arc;

use crate::store::AppointmentStore;

pub struct CancelAppointmentTool {
    store: Arc<dyn AppointmentStore>,
}

impl CancelAppointmentTool {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelAppointmentTool {
    fn name(&self) -> &str {
        "cancel_appointment"
    }

    fn description(&self) -> &str {
        "Cancel an existing appointment. Requires the customer's confirmation number (APT-...)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "confirmation_number": {
                    "type": "string",
                    "description": "The confirmation number, e.g. APT-3F9K2A"
                }
            },
            "required": ["confirmation_number"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolReply, ToolError> {
        let confirmation = arguments["confirmation_number"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArguments("Missing 'confirmation_number' argument".into())
            })?;

        let response = self.store.cancel(confirmation).await?;
        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| format!("Appointment not found: {confirmation}"));
            return Ok(ToolReply::error("", reason));
        }
        Ok(ToolReply::success(
            "",
            format!("Appointment {confirmation} has been cancelled."),
        ))
    }
}

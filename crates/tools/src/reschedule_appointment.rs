//! Move an appointment to a new slot. Mutating; never retried.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use bookline_core::tool::{Tool, ToolReply};
use std::sync::Arc;

use crate::store::AppointmentStore;

pub struct RescheduleAppointmentTool {
    store: Arc<dyn AppointmentStore>,
}

impl RescheduleAppointmentTool {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RescheduleAppointmentTool {
    fn name(&self) -> &str {
        "reschedule_appointment"
    }

    fn description(&self) -> &str {
        "Move an existing appointment to a new date and time. Requires the confirmation number and the new slot."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "confirmation_number": {
                    "type": "string",
                    "description": "The confirmation number, e.g. APT-3F9K2A"
                },
                "date": { "type": "string", "description": "New date, YYYY-MM-DD" },
                "start_time": { "type": "string", "description": "New start time, HH:MM" }
            },
            "required": ["confirmation_number", "date", "start_time"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolReply, ToolError> {
        let confirmation = arguments["confirmation_number"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArguments("Missing 'confirmation_number' argument".into())
            })?;
        let date = arguments["date"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'date' argument".into()))?;
        let start_time = arguments["start_time"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'start_time' argument".into()))?;

        let response = self.store.reschedule(confirmation, date, start_time).await?;
        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| format!("Appointment not found: {confirmation}"));
            return Ok(ToolReply::error("", reason));
        }
        Ok(ToolReply::success(
            "",
            format!("Appointment {confirmation} moved to {date} at {start_time}."),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Appointment, MockAppointmentStore};

    fn seeded_store() -> Arc<MockAppointmentStore> {
        let store = Arc::new(MockAppointmentStore::new());
        store.seed_appointment(Appointment {
            confirmation_number: "APT-7QX2MB".into(),
            service_id: "srv-001".into(),
            service_name: "Haircut".into(),
            date: "2026-09-01".into(),
            start_time: "10:00".into(),
            end_time: "10:30".into(),
            status: "confirmed".into(),
        });
        store
    }

    #[tokio::test]
    async fn moves_a_known_appointment() {
        let tool = RescheduleAppointmentTool::new(seeded_store());
        let reply = tool
            .execute(serde_json::json!({
                "confirmation_number": "APT-7QX2MB",
                "date": "2026-09-02",
                "start_time": "09:00"
            }))
            .await
            .unwrap();
        assert_eq!(
            reply.render(),
            "[SUCCESS] Appointment APT-7QX2MB moved to 2026-09-02 at 09:00."
        );
    }

    #[tokio::test]
    async fn unknown_confirmation_is_a_not_found_reply() {
        let tool = RescheduleAppointmentTool::new(seeded_store());
        let reply = tool
            .execute(serde_json::json!({
                "confirmation_number": "APT-000000",
                "date": "2026-09-02",
                "start_time": "09:00"
            }))
            .await
            .unwrap();
        assert!(reply.render().starts_with("[ERROR] Appointment not found"));
    }

    #[tokio::test]
    async fn missing_slot_fields_are_rejected() {
        let tool = RescheduleAppointmentTool::new(seeded_store());
        let err = tool
            .execute(serde_json::json!({"confirmation_number": "APT-7QX2MB"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

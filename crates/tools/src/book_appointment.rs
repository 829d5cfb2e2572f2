//! Create an appointment. Mutating; the dispatcher never retries this, so a
//! transport fault after the request was sent is reported, not re-attempted.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use bookline_core::tool::{Tool, ToolReply};
use std::sync::Arc;

use crate::store::{AppointmentStore, NewAppointment};

pub struct BookAppointmentTool {
    store: Arc<dyn AppointmentStore>,
}

impl BookAppointmentTool {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

fn required<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

#[async_trait]
impl Tool for BookAppointmentTool {
    fn name(&self) -> &str {
        "book_appointment"
    }

    fn description(&self) -> &str {
        "Create an appointment once the service, slot, and all contact details are collected and the customer has confirmed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "service_id": { "type": "string" },
                "date": { "type": "string", "description": "YYYY-MM-DD" },
                "start_time": { "type": "string", "description": "HH:MM" },
                "client_name": { "type": "string" },
                "client_email": { "type": "string" },
                "client_phone": { "type": "string" }
            },
            "required": ["service_id", "date", "start_time", "client_name", "client_email", "client_phone"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolReply, ToolError> {
        let appointment = NewAppointment {
            service_id: required(&arguments, "service_id")?.to_string(),
            date: required(&arguments, "date")?.to_string(),
            start_time: required(&arguments, "start_time")?.to_string(),
            client_name: required(&arguments, "client_name")?.to_string(),
            client_email: required(&arguments, "client_email")?.to_string(),
            client_phone: required(&arguments, "client_phone")?.to_string(),
        };

        let response = self.store.book(appointment).await?;
        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| "Booking was refused".into());
            let output = if response.alternatives.is_empty() {
                reason
            } else {
                let lines: Vec<String> = response
                    .alternatives
                    .iter()
                    .map(|s| format!("- {} {}-{}", s.date, s.start_time, s.end_time))
                    .collect();
                format!("{reason}. Alternative slots:\n{}", lines.join("\n"))
            };
            return Ok(ToolReply::error("", output));
        }

        match response.data {
            Some(booked) => Ok(ToolReply::success(
                "",
                format!(
                    "Appointment booked. Confirmation: {} ({} on {} at {})",
                    booked.confirmation_number, booked.service_name, booked.date, booked.start_time
                ),
            )),
            None => Ok(ToolReply::error(
                "",
                "Booking API returned success without appointment data",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockAppointmentStore;

    fn booking_args() -> serde_json::Value {
        serde_json::json!({
            "service_id": "srv-001",
            "date": "2026-09-01",
            "start_time": "10:00",
            "client_name": "Dana Fox",
            "client_email": "dana@example.com",
            "client_phone": "+1 555 0100"
        })
    }

    #[tokio::test]
    async fn successful_booking_reports_confirmation() {
        let tool = BookAppointmentTool::new(Arc::new(MockAppointmentStore::new()));
        let reply = tool.execute(booking_args()).await.unwrap();
        let rendered = reply.render();
        assert!(rendered.starts_with("[SUCCESS] Appointment booked. Confirmation: APT-"));
    }

    #[tokio::test]
    async fn slot_conflict_lists_alternatives() {
        let store = Arc::new(MockAppointmentStore::new());
        store.take_next_slot();
        let tool = BookAppointmentTool::new(store);
        let reply = tool.execute(booking_args()).await.unwrap();
        let rendered = reply.render();
        assert!(rendered.starts_with("[ERROR]"));
        assert!(rendered.contains("Alternative slots"));
    }

    #[tokio::test]
    async fn missing_contact_field_is_rejected_before_the_api_call() {
        let tool = BookAppointmentTool::new(Arc::new(MockAppointmentStore::new()));
        let mut args = booking_args();
        args["client_email"] = serde_json::json!("");
        let err = tool.execute(args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

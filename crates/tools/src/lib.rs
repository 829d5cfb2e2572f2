//! Booking tools for Bookline.
//!
//! Tools are thin adapters over the appointment store: they parse the
//! model's arguments, call the store, and phrase the outcome as a tagged
//! reply the model can read back.

pub mod book_appointment;
pub mod cache;
pub mod cancel_appointment;
pub mod check_availability;
pub mod list_services;
pub mod reschedule_appointment;
pub mod store;
pub mod validate_contact;

use bookline_core::tool::ToolRegistry;
use std::sync::Arc;

pub use cache::BoundedCache;
pub use store::{
    Appointment, AppointmentStore, HttpAppointmentStore, MockAppointmentStore, NewAppointment,
    Service, Slot, StoreResponse,
};

use book_appointment::BookAppointmentTool;
use cancel_appointment::CancelAppointmentTool;
use check_availability::CheckAvailabilityTool;
use list_services::ListServicesTool;
use reschedule_appointment::RescheduleAppointmentTool;
use validate_contact::ValidateContactTool;

/// Build the full booking tool registry against a store.
pub fn booking_registry(store: Arc<dyn AppointmentStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListServicesTool::new(store.clone())));
    registry.register(Box::new(CheckAvailabilityTool::new(store.clone())));
    registry.register(Box::new(BookAppointmentTool::new(store.clone())));
    registry.register(Box::new(CancelAppointmentTool::new(store.clone())));
    registry.register(Box::new(RescheduleAppointmentTool::new(store)));
    registry.register(Box::new(ValidateContactTool::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::tool::{ToolCall, ToolOutcome};

    #[test]
    fn registry_exposes_all_booking_tools() {
        let registry = booking_registry(Arc::new(MockAppointmentStore::new()));
        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "book_appointment",
                "cancel_appointment",
                "check_availability",
                "list_services",
                "reschedule_appointment",
                "validate_contact",
            ]
        );
    }

    #[tokio::test]
    async fn offline_store_renders_as_connection_error_reply() {
        let store = Arc::new(MockAppointmentStore::new());
        store.set_offline(true);
        let registry = booking_registry(store);

        let call = ToolCall {
            id: "call_1".into(),
            name: "list_services".into(),
            arguments: serde_json::json!({}),
        };
        let reply = registry.dispatch(&call).await;
        assert_eq!(reply.outcome, ToolOutcome::Error);
        assert!(
            reply
                .render()
                .starts_with("[ERROR] Could not connect to booking API")
        );
    }
}

//! Appointment store client — the seam between tools and the booking API.
//!
//! Transport failures (timeouts, connection errors, 5xx) surface as
//! `ToolError`; business outcomes (slot taken, unknown confirmation) come
//! back as an unsuccessful `StoreResponse` so tools can phrase them for the
//! model instead of treating them as faults.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// A bookable service offered by the business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
}

/// An open time slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// Payload for creating an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub service_id: String,
    pub date: String,
    pub start_time: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
}

/// A booked appointment as the API reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub confirmation_number: String,
    pub service_id: String,
    pub service_name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
}

/// Typed response envelope from the booking API.
///
/// `success: false` with an `error` string is a business refusal, not a
/// transport fault. `alternatives` carries nearby open slots when a
/// requested slot was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse<T> {
    pub success: bool,
    // No `default` here: it would put a `T: Default` bound on the derived
    // Deserialize impl, and a missing Option field decodes to None anyway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Slot>,
}

impl<T> StoreResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            alternatives: Vec::new(),
        }
    }

    pub fn refused(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            alternatives: Vec::new(),
        }
    }

    pub fn refused_with_alternatives(error: impl Into<String>, alternatives: Vec<Slot>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            alternatives,
        }
    }
}

/// Client for the external booking API.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list_services(&self) -> Result<StoreResponse<Vec<Service>>, ToolError>;

    async fn availability(
        &self,
        service_id: &str,
        date_from: Option<&str>,
    ) -> Result<StoreResponse<Vec<Slot>>, ToolError>;

    async fn book(&self, appointment: NewAppointment)
    -> Result<StoreResponse<Appointment>, ToolError>;

    async fn cancel(&self, confirmation: &str) -> Result<StoreResponse<Appointment>, ToolError>;

    async fn reschedule(
        &self,
        confirmation: &str,
        date: &str,
        start_time: &str,
    ) -> Result<StoreResponse<Appointment>, ToolError>;
}

/// HTTP client for the booking API.
pub struct HttpAppointmentStore {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpAppointmentStore {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ToolError::Upstream {
                tool_name: "booking_api".into(),
                reason: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ToolError {
        if e.is_timeout() {
            ToolError::Timeout {
                tool_name: "booking_api".into(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            ToolError::Upstream {
                tool_name: "booking_api".into(),
                reason: e.to_string(),
            }
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<StoreResponse<T>, ToolError> {
        let status = response.status().as_u16();
        if status >= 500 {
            warn!(status, "Booking API server error");
            return Err(ToolError::Upstream {
                tool_name: "booking_api".into(),
                reason: format!("server returned {status}"),
            });
        }
        // 4xx responses still carry a StoreResponse body with the refusal.
        response
            .json()
            .await
            .map_err(|e| self.transport_error(e))
    }
}

#[async_trait]
impl AppointmentStore for HttpAppointmentStore {
    async fn list_services(&self) -> Result<StoreResponse<Vec<Service>>, ToolError> {
        let url = format!("{}/services", self.base_url);
        debug!(%url, "Fetching services");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn availability(
        &self,
        service_id: &str,
        date_from: Option<&str>,
    ) -> Result<StoreResponse<Vec<Slot>>, ToolError> {
        let url = format!("{}/availability", self.base_url);
        let mut query = vec![("service_id", service_id.to_string())];
        if let Some(from) = date_from {
            query.push(("date_from", from.to_string()));
        }
        debug!(%url, service_id, "Fetching availability");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn book(
        &self,
        appointment: NewAppointment,
    ) -> Result<StoreResponse<Appointment>, ToolError> {
        let url = format!("{}/appointments", self.base_url);
        debug!(%url, service_id = %appointment.service_id, "Creating appointment");
        let response = self
            .client
            .post(&url)
            .json(&appointment)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn cancel(&self, confirmation: &str) -> Result<StoreResponse<Appointment>, ToolError> {
        let url = format!("{}/appointments/{confirmation}", self.base_url);
        debug!(%url, "Cancelling appointment");
        let response = self
            .client
            .patch(&url)
            .json(&serde_json::json!({"status": "cancelled"}))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }

    async fn reschedule(
        &self,
        confirmation: &str,
        date: &str,
        start_time: &str,
    ) -> Result<StoreResponse<Appointment>, ToolError> {
        let url = format!("{}/appointments/{confirmation}/reschedule", self.base_url);
        debug!(%url, date, start_time, "Rescheduling appointment");
        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({"date": date, "start_time": start_time}))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response).await
    }
}

/// In-process store with canned data, used by tests and demos.
pub struct MockAppointmentStore {
    services: Vec<Service>,
    slots: Vec<Slot>,
    appointments: Mutex<HashMap<String, Appointment>>,
    /// When set, every call fails as if the API were unreachable.
    offline: AtomicBool,
    /// When set, the next book() is refused with alternative slots.
    slot_taken: AtomicBool,
    counter: Mutex<u32>,
}

impl MockAppointmentStore {
    pub fn new() -> Self {
        Self {
            services: vec![
                Service {
                    id: "srv-001".into(),
                    name: "Haircut".into(),
                    duration_minutes: 30,
                },
                Service {
                    id: "srv-002".into(),
                    name: "Massage".into(),
                    duration_minutes: 60,
                },
            ],
            slots: vec![
                Slot {
                    date: "2026-09-01".into(),
                    start_time: "10:00".into(),
                    end_time: "10:30".into(),
                },
                Slot {
                    date: "2026-09-01".into(),
                    start_time: "14:00".into(),
                    end_time: "14:30".into(),
                },
                Slot {
                    date: "2026-09-02".into(),
                    start_time: "09:00".into(),
                    end_time: "09:30".into(),
                },
            ],
            appointments: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            slot_taken: AtomicBool::new(false),
            counter: Mutex::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `book()` call fail with a slot conflict.
    pub fn take_next_slot(&self) {
        self.slot_taken.store(true, Ordering::SeqCst);
    }

    /// Seed an existing appointment so cancel/reschedule can find it.
    pub fn seed_appointment(&self, appointment: Appointment) {
        if let Ok(mut appointments) = self.appointments.lock() {
            appointments.insert(appointment.confirmation_number.clone(), appointment);
        }
    }

    fn check_online(&self) -> Result<(), ToolError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ToolError::Upstream {
                tool_name: "booking_api".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }

    fn next_confirmation(&self) -> String {
        let mut counter = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        *counter += 1;
        format!("APT-{:06}", *counter)
    }
}

impl Default for MockAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentStore for MockAppointmentStore {
    async fn list_services(&self) -> Result<StoreResponse<Vec<Service>>, ToolError> {
        self.check_online()?;
        Ok(StoreResponse::ok(self.services.clone()))
    }

    async fn availability(
        &self,
        service_id: &str,
        date_from: Option<&str>,
    ) -> Result<StoreResponse<Vec<Slot>>, ToolError> {
        self.check_online()?;
        if !self.services.iter().any(|s| s.id == service_id) {
            return Ok(StoreResponse::refused(format!(
                "Service not found: {service_id}"
            )));
        }
        let slots: Vec<Slot> = self
            .slots
            .iter()
            .filter(|s| date_from.is_none_or(|from| s.date.as_str() >= from))
            .cloned()
            .collect();
        Ok(StoreResponse::ok(slots))
    }

    async fn book(
        &self,
        appointment: NewAppointment,
    ) -> Result<StoreResponse<Appointment>, ToolError> {
        self.check_online()?;
        if self.slot_taken.swap(false, Ordering::SeqCst) {
            return Ok(StoreResponse::refused_with_alternatives(
                "Requested slot is no longer available",
                self.slots.clone(),
            ));
        }
        let service_name = self
            .services
            .iter()
            .find(|s| s.id == appointment.service_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| appointment.service_id.clone());

        let booked = Appointment {
            confirmation_number: self.next_confirmation(),
            service_id: appointment.service_id,
            service_name,
            date: appointment.date,
            start_time: appointment.start_time.clone(),
            end_time: appointment.start_time,
            status: "confirmed".into(),
        };
        self.seed_appointment(booked.clone());
        Ok(StoreResponse::ok(booked))
    }

    async fn cancel(&self, confirmation: &str) -> Result<StoreResponse<Appointment>, ToolError> {
        self.check_online()?;
        let mut appointments = self
            .appointments
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        match appointments.get_mut(confirmation) {
            Some(appointment) => {
                appointment.status = "cancelled".into();
                Ok(StoreResponse::ok(appointment.clone()))
            }
            None => Ok(StoreResponse::refused(format!(
                "Appointment not found: {confirmation}"
            ))),
        }
    }

    async fn reschedule(
        &self,
        confirmation: &str,
        date: &str,
        start_time: &str,
    ) -> Result<StoreResponse<Appointment>, ToolError> {
        self.check_online()?;
        let mut appointments = self
            .appointments
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        match appointments.get_mut(confirmation) {
            Some(appointment) => {
                appointment.date = date.to_string();
                appointment.start_time = start_time.to_string();
                appointment.status = "confirmed".into();
                Ok(StoreResponse::ok(appointment.clone()))
            }
            None => Ok(StoreResponse::refused(format!(
                "Appointment not found: {confirmation}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_booking() -> NewAppointment {
        NewAppointment {
            service_id: "srv-001".into(),
            date: "2026-09-01".into(),
            start_time: "10:00".into(),
            client_name: "Dana Fox".into(),
            client_email: "dana@example.com".into(),
            client_phone: "+1 555 0100".into(),
        }
    }

    #[test]
    fn refusal_body_decodes_without_data() {
        // Appointment has no Default impl; this decodes only if the derived
        // Deserialize on StoreResponse<T> carries no T: Default bound.
        let body = r#"{"success":false,"error":"Appointment not found: APT-999999"}"#;
        let response: StoreResponse<Appointment> = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(
            response.error.as_deref(),
            Some("Appointment not found: APT-999999")
        );
        assert!(response.alternatives.is_empty());
    }

    #[tokio::test]
    async fn mock_books_and_cancels() {
        let store = MockAppointmentStore::new();
        let booked = store.book(new_booking()).await.unwrap();
        assert!(booked.success);
        let confirmation = booked.data.unwrap().confirmation_number;
        assert!(confirmation.starts_with("APT-"));

        let cancelled = store.cancel(&confirmation).await.unwrap();
        assert!(cancelled.success);
        assert_eq!(cancelled.data.unwrap().status, "cancelled");
    }

    #[tokio::test]
    async fn unknown_confirmation_is_a_refusal_not_a_fault() {
        let store = MockAppointmentStore::new();
        let response = store.cancel("APT-999999").await.unwrap();
        assert!(!response.success);
        assert!(response.error.unwrap().contains("Appointment not found"));
    }

    #[tokio::test]
    async fn slot_conflict_carries_alternatives() {
        let store = MockAppointmentStore::new();
        store.take_next_slot();
        let response = store.book(new_booking()).await.unwrap();
        assert!(!response.success);
        assert!(!response.alternatives.is_empty());

        // Flag is one-shot
        let retry = store.book(new_booking()).await.unwrap();
        assert!(retry.success);
    }

    #[tokio::test]
    async fn offline_store_surfaces_transport_fault() {
        let store = MockAppointmentStore::new();
        store.set_offline(true);
        let err = store.list_services().await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream { .. }));
    }

    #[tokio::test]
    async fn availability_filters_by_date() {
        let store = MockAppointmentStore::new();
        let all = store.availability("srv-001", None).await.unwrap();
        assert_eq!(all.data.unwrap().len(), 3);

        let later = store
            .availability("srv-001", Some("2026-09-02"))
            .await
            .unwrap();
        assert_eq!(later.data.unwrap().len(), 1);
    }
}

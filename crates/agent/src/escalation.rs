//! Retry/escalation controller for the verification states.
//!
//! Lookups can fail two ways: the customer gave a bad confirmation number
//! (correctable, worth a couple of retries) or the booking API is down
//! (nothing the customer can do). The controller turns a tool reply plus
//! the per-flow retry counter into a decision; it only runs inside
//! CancelVerify / RescheduleVerify, callers route around it elsewhere.

use bookline_core::collected::RetryCounts;
use bookline_core::state::{ConversationState, Flow};
use tracing::info;

/// Coarse classification of the latest tool reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The customer can fix this by re-checking what they typed.
    UserCorrectable,
    /// Infrastructure fault; retrying the customer will not help.
    SystemFault,
    /// Not an error at all.
    NotAnError,
}

const USER_CORRECTABLE_MARKERS: &[&str] = &["not found", "invalid format"];
const SYSTEM_FAULT_MARKERS: &[&str] = &["could not connect", "timeout", "unavailable"];

/// Classify a rendered tool reply by substring.
pub fn classify(reply_text: &str) -> ErrorClass {
    if !reply_text.starts_with("[ERROR]") {
        return ErrorClass::NotAnError;
    }
    let lower = reply_text.to_lowercase();
    if SYSTEM_FAULT_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorClass::SystemFault;
    }
    if USER_CORRECTABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorClass::UserCorrectable;
    }
    // Unrecognized errors are left to the model; only the known fault and
    // not-found shapes trigger scripted handling.
    ErrorClass::NotAnError
}

/// What the orchestrator should do after a verification lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationDecision {
    /// Nothing to handle; let the model speak.
    NoOp,
    /// Let the model ask the customer to re-check, no scripted override.
    RetrySilently,
    /// Stop the loop and return the scripted message; move to PostAction.
    Escalate { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct RetryController;

impl RetryController {
    pub fn new() -> Self {
        Self
    }

    pub fn observe(
        &self,
        state: ConversationState,
        last_tool_reply: &str,
        counts: &mut RetryCounts,
    ) -> EscalationDecision {
        if !state.is_verification() {
            return EscalationDecision::NoOp;
        }
        let Some(flow) = state.flow() else {
            return EscalationDecision::NoOp;
        };

        match classify(last_tool_reply) {
            ErrorClass::NotAnError => EscalationDecision::NoOp,
            ErrorClass::SystemFault => {
                info!(flow = flow.key(), "Verification hit a system fault, escalating");
                EscalationDecision::Escalate {
                    message: system_fault_message(),
                }
            }
            ErrorClass::UserCorrectable => {
                let count = counts.increment(flow.key());
                if counts.exhausted(flow.key()) {
                    info!(flow = flow.key(), count, "Verification retries exhausted");
                    EscalationDecision::Escalate {
                        message: exhausted_message(flow),
                    }
                } else {
                    EscalationDecision::RetrySilently
                }
            }
        }
    }
}

/// Scripted reply for infrastructure faults.
pub fn system_fault_message() -> String {
    "I'm sorry, we're having technical difficulties reaching the booking \
     system right now. Please try again in a few minutes."
        .to_string()
}

/// Scripted reply when the customer's confirmation number cannot be found
/// after repeated attempts.
pub fn exhausted_message(flow: Flow) -> String {
    format!(
        "I wasn't able to find an appointment with that confirmation number, \
         so I can't complete the {} here. Your confirmation number starts \
         with APT- and is in the email you received when you booked. Would \
         you like to book a new appointment instead?",
        flow.noun()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::collected::ESCALATION_THRESHOLD;

    #[test]
    fn success_reply_is_noop() {
        let mut counts = RetryCounts::new();
        let decision = RetryController::new().observe(
            ConversationState::CancelVerify,
            "[SUCCESS] Appointment APT-3F9K2A has been cancelled.",
            &mut counts,
        );
        assert_eq!(decision, EscalationDecision::NoOp);
        assert_eq!(counts.get("cancel"), 0);
    }

    #[test]
    fn first_not_found_retries_silently() {
        let mut counts = RetryCounts::new();
        let decision = RetryController::new().observe(
            ConversationState::CancelVerify,
            "[ERROR] Appointment not found: APT-000000",
            &mut counts,
        );
        assert_eq!(decision, EscalationDecision::RetrySilently);
        assert_eq!(counts.get("cancel"), 1);
    }

    #[test]
    fn second_not_found_escalates_with_guidance() {
        let controller = RetryController::new();
        let mut counts = RetryCounts::new();
        let reply = "[ERROR] Appointment not found: APT-000000";
        controller.observe(ConversationState::RescheduleVerify, reply, &mut counts);
        let decision =
            controller.observe(ConversationState::RescheduleVerify, reply, &mut counts);
        match decision {
            EscalationDecision::Escalate { message } => {
                assert!(message.contains("APT-"));
                assert!(message.contains("rescheduling"));
                assert!(message.contains("book a new appointment"));
            }
            other => panic!("expected escalation, got {other:?}"),
        }
    }

    #[test]
    fn system_fault_escalates_immediately_without_counting() {
        let mut counts = RetryCounts::new();
        let decision = RetryController::new().observe(
            ConversationState::CancelVerify,
            "[ERROR] Could not connect to booking API: timeout after 10s",
            &mut counts,
        );
        assert!(matches!(decision, EscalationDecision::Escalate { .. }));
        assert_eq!(counts.get("cancel"), 0);
    }

    #[test]
    fn counters_saturate_and_decision_is_idempotent() {
        let controller = RetryController::new();
        let mut counts = RetryCounts::new();
        let reply = "[ERROR] Appointment not found: APT-000000";
        for _ in 0..5 {
            controller.observe(ConversationState::CancelVerify, reply, &mut counts);
        }
        assert_eq!(counts.get("cancel"), ESCALATION_THRESHOLD);
        let decision = controller.observe(ConversationState::CancelVerify, reply, &mut counts);
        assert!(matches!(decision, EscalationDecision::Escalate { .. }));
    }

    #[test]
    fn outside_verification_states_is_noop() {
        let mut counts = RetryCounts::new();
        let decision = RetryController::new().observe(
            ConversationState::CollectEmail,
            "[ERROR] Appointment not found: APT-000000",
            &mut counts,
        );
        assert_eq!(decision, EscalationDecision::NoOp);
    }

    #[test]
    fn unrecognized_errors_are_not_scripted() {
        assert_eq!(
            classify("[ERROR] something nobody anticipated"),
            ErrorClass::NotAnError
        );
        assert_eq!(classify("[VALID] email looks fine"), ErrorClass::NotAnError);
    }

    #[test]
    fn malformed_arguments_in_verification_neither_escalate_nor_count() {
        let mut counts = RetryCounts::new();
        let decision = RetryController::new().observe(
            ConversationState::CancelVerify,
            "[ERROR] Invalid tool arguments: Missing 'confirmation_number' argument",
            &mut counts,
        );
        assert_eq!(decision, EscalationDecision::NoOp);
        assert_eq!(counts.get("cancel"), 0);
    }
}

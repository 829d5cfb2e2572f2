//! System prompt composition.
//!
//! The composed prompt is a pure function of the conversation state:
//! byte-identical output for the same state on every call, so provider-side
//! prompt caching stays warm across turns.

use bookline_core::state::ConversationState;

/// Stable operating preamble shared by every state.
const PREAMBLE: &str = "\
You are a booking assistant for appointment scheduling. You help customers \
book, cancel, and reschedule appointments. Stay on topic: politely decline \
anything unrelated to appointments. Use the provided tools to read services \
and availability and to change bookings; never invent confirmation numbers, \
services, or time slots. Ask for exactly one piece of information at a time.\
\n\nCurrent objective: ";

/// The per-state directive appended to the preamble.
pub fn directive_for(state: ConversationState) -> &'static str {
    use ConversationState::*;
    match state {
        Greeting => {
            "Greet the customer and ask whether they want to book, cancel, or \
             reschedule an appointment."
        }
        CollectService => {
            "Find out which service the customer wants. Call list_services and \
             present the options, then ask them to pick one."
        }
        CollectTimePreference => {
            "Ask whether the customer prefers mornings, afternoons, or a \
             specific day, so availability can be narrowed down."
        }
        ShowAvailability => {
            "Call check_availability for the chosen service and present the \
             open slots. Ask the customer to pick a date."
        }
        CollectDate => "Ask the customer which date they would like, from the shown slots.",
        CollectTime => "Ask the customer which start time they would like on the chosen date.",
        CollectName => "Ask for the customer's full name.",
        CollectEmail => {
            "Ask for the customer's email address. Validate it with \
             validate_contact before accepting it."
        }
        CollectPhone => {
            "Ask for the customer's phone number. Validate it with \
             validate_contact before accepting it."
        }
        ConfirmBooking => {
            "Read the full booking back to the customer (service, date, time, \
             name, email, phone) and ask them to confirm before anything is \
             created."
        }
        CreateAppointment => {
            "The customer has confirmed. Call book_appointment with the \
             collected details and report the confirmation number they should \
             keep."
        }
        CancelAskConfirmation => {
            "The customer wants to cancel. Ask for their confirmation number \
             (it looks like APT-XXXXXX and is in their booking email)."
        }
        CancelVerify => {
            "Verify the confirmation number the customer gave by calling \
             cancel-side lookups. If it is not found, ask them to re-check it."
        }
        CancelConfirm => {
            "Read the appointment details back and ask the customer to confirm \
             they really want to cancel."
        }
        CancelExecute => {
            "The customer confirmed the cancellation. Call cancel_appointment \
             and report the outcome."
        }
        RescheduleAskConfirmation => {
            "The customer wants to reschedule. Ask for their confirmation \
             number (it looks like APT-XXXXXX and is in their booking email)."
        }
        RescheduleVerify => {
            "Verify the confirmation number the customer gave. If it is not \
             found, ask them to re-check it."
        }
        RescheduleShowAvailability => {
            "Call check_availability for the appointment's service and present \
             open slots for the move."
        }
        RescheduleSelectSlot => {
            "Ask the customer which of the shown slots they want to move their \
             appointment to."
        }
        RescheduleExecute => {
            "The customer picked a new slot. Call reschedule_appointment and \
             report the outcome."
        }
        PostAction => {
            "The previous action is finished. Ask whether there is anything \
             else you can help with: a new booking, a cancellation, or a \
             reschedule."
        }
        Complete => "Thank the customer and close the conversation warmly.",
    }
}

/// Compose the full system prompt for a state.
pub fn compose_system_prompt(state: ConversationState) -> String {
    format!("{PREAMBLE}{}", directive_for(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_stable_across_calls() {
        for state in ConversationState::all() {
            assert_eq!(
                compose_system_prompt(*state),
                compose_system_prompt(*state)
            );
        }
    }

    #[test]
    fn every_state_has_a_distinct_directive() {
        let states = ConversationState::all();
        for (i, a) in states.iter().enumerate() {
            for b in &states[i + 1..] {
                assert_ne!(directive_for(*a), directive_for(*b), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn verification_states_mention_the_confirmation_shape() {
        assert!(directive_for(ConversationState::CancelAskConfirmation).contains("APT-"));
        assert!(directive_for(ConversationState::RescheduleAskConfirmation).contains("APT-"));
    }
}

//! State inferencer.
//!
//! The conversation state is not event-sourced: it is re-derived from
//! scratch every turn out of the collected data and the recent transcript.
//! A stale or hand-edited stored state therefore self-heals on the next
//! turn. The function is total; any input yields some state.

use bookline_core::collected::CollectedData;
use bookline_core::message::{Message, Role};
use bookline_core::state::ConversationState;

/// Keyword lists and shape checks the inferencer consults. Carried as data
/// so deployments can tune vocabulary without touching the ladder itself.
#[derive(Debug, Clone)]
pub struct InferencePolicy {
    pub service_terms: Vec<String>,
    pub cancel_terms: Vec<String>,
    pub reschedule_terms: Vec<String>,
    /// Confirmation numbers look like `{prefix}` + at least `min_suffix`
    /// alphanumerics, e.g. APT-3F9K2A.
    pub confirmation_prefix: String,
    pub confirmation_min_suffix: usize,
    /// How many trailing messages count as "recent".
    pub recent_window: usize,
}

impl Default for InferencePolicy {
    fn default() -> Self {
        Self {
            service_terms: [
                "haircut", "cut", "trim", "color", "massage", "facial", "manicure",
                "pedicure", "consultation", "cleaning", "checkup",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            cancel_terms: ["cancel", "call off", "don't want my appointment"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reschedule_terms: ["reschedule", "move my appointment", "change my appointment"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            confirmation_prefix: "APT-".into(),
            confirmation_min_suffix: 6,
            recent_window: 6,
        }
    }
}

impl InferencePolicy {
    /// Whether `text` contains a confirmation-number-shaped token.
    pub fn contains_confirmation_shape(&self, text: &str) -> bool {
        self.find_confirmation(text).is_some()
    }

    /// Extract the first confirmation-number-shaped token, if any.
    pub fn find_confirmation(&self, text: &str) -> Option<String> {
        let prefix = self.confirmation_prefix.as_str();
        let mut start = 0;
        while let Some(at) = text[start..].find(prefix) {
            let token_start = start + at;
            let suffix = &text[token_start + prefix.len()..];
            let run: String = suffix
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            if run.len() >= self.confirmation_min_suffix {
                return Some(format!("{prefix}{run}"));
            }
            start = token_start + prefix.len();
        }
        None
    }
}

/// Derive the current conversation state.
pub fn infer_state(
    collected: &CollectedData,
    messages: &[Message],
    policy: &InferencePolicy,
) -> ConversationState {
    use ConversationState::*;

    // A finished booking outranks everything else.
    if collected.confirmation_number.is_some() {
        return Complete;
    }

    // Deepest-filled booking field decides the next thing to ask for.
    if collected.client_phone.is_some() {
        return ConfirmBooking;
    }
    if collected.client_email.is_some() {
        return CollectPhone;
    }
    if collected.client_name.is_some() {
        return CollectEmail;
    }
    if collected.start_time.is_some() {
        return CollectName;
    }
    if collected.date.is_some() {
        return CollectTime;
    }

    let recent = recent_messages(messages, policy.recent_window);

    if collected.service_id.is_some() || collected.service_name.is_some() {
        if availability_was_shown(&recent) {
            return CollectDate;
        }
        return CollectTimePreference;
    }

    // Fresh conversation rungs: tool activity, then intent keywords.
    if services_were_listed(&recent) {
        if latest_user_text(messages)
            .is_some_and(|text| contains_any(&text.to_lowercase(), &policy.service_terms))
        {
            return CollectTimePreference;
        }
        return CollectService;
    }

    if let Some(intent) = detect_intent(&recent, policy) {
        return intent;
    }

    CollectService
}

fn recent_messages(messages: &[Message], window: usize) -> &[Message] {
    let start = messages.len().saturating_sub(window);
    &messages[start..]
}

fn latest_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn called_tool_recently(recent: &[Message], tool_name: &str) -> bool {
    recent
        .iter()
        .any(|m| m.tool_calls.iter().any(|tc| tc.name == tool_name))
}

fn services_were_listed(recent: &[Message]) -> bool {
    called_tool_recently(recent, "list_services")
}

fn availability_was_shown(recent: &[Message]) -> bool {
    called_tool_recently(recent, "check_availability")
}

/// Look for cancel/reschedule intent in recent user turns. A message that
/// already carries a confirmation-shaped token skips straight to the
/// verification state.
fn detect_intent(recent: &[Message], policy: &InferencePolicy) -> Option<ConversationState> {
    enum IntentKind {
        Cancel,
        Reschedule,
    }

    let user_turns: Vec<&Message> = recent.iter().filter(|m| m.role == Role::User).collect();
    let intent = user_turns.iter().rev().find_map(|m| {
        let lower = m.content.to_lowercase();
        if contains_any(&lower, &policy.cancel_terms) {
            Some(IntentKind::Cancel)
        } else if contains_any(&lower, &policy.reschedule_terms) {
            Some(IntentKind::Reschedule)
        } else {
            None
        }
    })?;

    let has_confirmation = user_turns
        .iter()
        .any(|m| policy.contains_confirmation_shape(&m.content));

    Some(match (intent, has_confirmation) {
        (IntentKind::Cancel, true) => ConversationState::CancelVerify,
        (IntentKind::Cancel, false) => ConversationState::CancelAskConfirmation,
        (IntentKind::Reschedule, true) => ConversationState::RescheduleVerify,
        (IntentKind::Reschedule, false) => ConversationState::RescheduleAskConfirmation,
    })
}

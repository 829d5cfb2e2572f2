//! Conversation state machine — the fixed state set and its transition table.
//!
//! The state set is small and closed: three flows (booking, cancellation,
//! rescheduling) plus the `PostAction` hub and the `Complete` terminal.
//! The table is process-wide, immutable data. It is consulted defensively
//! and by tests — the orchestrator re-derives state from collected data each
//! turn rather than driving transitions through it.

use serde::{Deserialize, Serialize};

/// Every discrete state a conversation can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    // --- Booking flow ---
    Greeting,
    CollectService,
    CollectTimePreference,
    ShowAvailability,
    CollectDate,
    CollectTime,
    CollectName,
    CollectEmail,
    CollectPhone,
    ConfirmBooking,
    CreateAppointment,

    // --- Cancellation flow ---
    CancelAskConfirmation,
    CancelVerify,
    CancelConfirm,
    CancelExecute,

    // --- Rescheduling flow ---
    RescheduleAskConfirmation,
    RescheduleVerify,
    RescheduleShowAvailability,
    RescheduleSelectSlot,
    RescheduleExecute,

    // --- Hub / terminal ---
    PostAction,
    Complete,
}

impl ConversationState {
    /// Whether this state verifies a user-supplied confirmation number.
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            ConversationState::CancelVerify | ConversationState::RescheduleVerify
        )
    }

    /// Which flow this state belongs to, if any. Hub and terminal states
    /// belong to no single flow.
    pub fn flow(&self) -> Option<Flow> {
        use ConversationState::*;
        match self {
            Greeting | CollectService | CollectTimePreference | ShowAvailability
            | CollectDate | CollectTime | CollectName | CollectEmail | CollectPhone
            | ConfirmBooking | CreateAppointment => Some(Flow::Booking),
            CancelAskConfirmation | CancelVerify | CancelConfirm | CancelExecute => {
                Some(Flow::Cancel)
            }
            RescheduleAskConfirmation | RescheduleVerify | RescheduleShowAvailability
            | RescheduleSelectSlot | RescheduleExecute => Some(Flow::Reschedule),
            PostAction | Complete => None,
        }
    }

    /// All state variants, in declaration order. Used by tests and by the
    /// prompt-determinism property check.
    pub fn all() -> &'static [ConversationState] {
        use ConversationState::*;
        &[
            Greeting,
            CollectService,
            CollectTimePreference,
            ShowAvailability,
            CollectDate,
            CollectTime,
            CollectName,
            CollectEmail,
            CollectPhone,
            ConfirmBooking,
            CreateAppointment,
            CancelAskConfirmation,
            CancelVerify,
            CancelConfirm,
            CancelExecute,
            RescheduleAskConfirmation,
            RescheduleVerify,
            RescheduleShowAvailability,
            RescheduleSelectSlot,
            RescheduleExecute,
            PostAction,
            Complete,
        ]
    }
}

/// One of the three top-level conversation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Booking,
    Cancel,
    Reschedule,
}

impl Flow {
    /// The key used for per-flow retry counters.
    pub fn key(&self) -> &'static str {
        match self {
            Flow::Booking => "booking",
            Flow::Cancel => "cancel",
            Flow::Reschedule => "reschedule",
        }
    }

    /// Human-readable flow name used in escalation messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Flow::Booking => "booking",
            Flow::Cancel => "cancellation",
            Flow::Reschedule => "rescheduling",
        }
    }
}

/// The static transition table: allowed next states for each state.
///
/// `Complete` is a true terminal and returns an empty slice.
/// `CreateAppointment` has only completion/escalation exits.
pub fn allowed_transitions(state: ConversationState) -> &'static [ConversationState] {
    use ConversationState::*;
    match state {
        Greeting => &[CollectService, CancelAskConfirmation, RescheduleAskConfirmation],
        CollectService => &[CollectTimePreference, CancelAskConfirmation, RescheduleAskConfirmation],
        CollectTimePreference => &[ShowAvailability],
        ShowAvailability => &[CollectDate, CollectTimePreference],
        CollectDate => &[CollectTime],
        CollectTime => &[CollectName],
        CollectName => &[CollectEmail],
        CollectEmail => &[CollectPhone],
        CollectPhone => &[ConfirmBooking],
        ConfirmBooking => &[CreateAppointment, CollectService],
        CreateAppointment => &[Complete, PostAction],

        CancelAskConfirmation => &[CancelVerify, PostAction],
        CancelVerify => &[CancelConfirm, PostAction],
        CancelConfirm => &[CancelExecute, PostAction],
        CancelExecute => &[PostAction],

        RescheduleAskConfirmation => &[RescheduleVerify, PostAction],
        RescheduleVerify => &[RescheduleShowAvailability, PostAction],
        RescheduleShowAvailability => &[RescheduleSelectSlot],
        RescheduleSelectSlot => &[RescheduleExecute, PostAction],
        RescheduleExecute => &[PostAction],

        PostAction => &[
            CollectService,
            CancelAskConfirmation,
            RescheduleAskConfirmation,
            Complete,
        ],
        Complete => &[],
    }
}

/// Validate that `intended` is a legal successor of `current`.
///
/// Pure lookup, no side effects. Used defensively and by tests; the
/// orchestrator does not gate the model-driven flow on it.
pub fn validate_transition(current: ConversationState, intended: ConversationState) -> bool {
    allowed_transitions(current).contains(&intended)
}

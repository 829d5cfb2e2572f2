//! The orchestration loop.
//!
//! One `process_turn` call takes a user message and drives the full cycle:
//! scan, infer state, compose the prompt, bound the window, call the model,
//! dispatch tool calls, and decide whether the retry controller overrides
//! the model. The turn is atomic: all mutations land on a scratch clone of
//! the session and are committed only when the turn produced a reply, so a
//! panic or early return never leaves a half-written session behind.

use bookline_core::error::Result;
use bookline_core::message::Message;
use bookline_core::provider::{ModelProvider, ModelRequest};
use bookline_core::session::Session;
use bookline_core::state::{ConversationState, validate_transition};
use bookline_core::tool::{ToolCall, ToolRegistry, ToolReply};
use bookline_security::SecurityScanner;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::trim;
use crate::escalation::{EscalationDecision, RetryController, system_fault_message};
use crate::inference::{InferencePolicy, infer_state};
use crate::prompts::compose_system_prompt;
use crate::token::estimate_tokens;

/// Fixed reply for inputs the scanner flags. Scripted, never model-generated.
const REFUSAL_REPLY: &str = "I can only help with booking, cancelling, or \
rescheduling appointments. What would you like to do?";

/// Reply when the provider fails outside a verification state.
const APOLOGY_REPLY: &str = "I'm sorry, I'm having trouble responding right \
now. Could you say that again in a moment?";

/// Reply when the tool loop hits its iteration bound.
const FALLBACK_REPLY: &str = "I'm sorry, I wasn't able to finish that just \
now. Could you tell me again what you'd like to do?";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub token_budget: usize,
    pub max_tool_iterations: usize,
    pub scanner_enabled: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: Some(1024),
            token_budget: 4096,
            max_tool_iterations: 8,
            scanner_enabled: true,
        }
    }
}

impl OrchestratorSettings {
    /// Derive loop settings from the application config.
    pub fn from_config(config: &bookline_config::AppConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: Some(config.provider.max_tokens),
            token_budget: config.agent.token_budget,
            max_tool_iterations: config.agent.max_tool_iterations as usize,
            scanner_enabled: config.security.scanner_enabled,
        }
    }
}

pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    scanner: SecurityScanner,
    policy: InferencePolicy,
    retry: RetryController,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        policy: InferencePolicy,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            scanner: SecurityScanner::new(),
            policy,
            retry: RetryController::new(),
            settings,
        }
    }

    /// Run one conversation turn. Always returns a user-facing reply; model
    /// and tool failures are absorbed into scripted or apologetic text.
    pub async fn process_turn(&self, session: &mut Session, user_text: &str) -> Result<String> {
        let mut scratch = session.clone();
        scratch.push(Message::user(user_text));

        if self.settings.scanner_enabled {
            let scan = self.scanner.scan(user_text);
            if !scan.is_safe {
                warn!(
                    thread_id = %scratch.thread_id,
                    threat = ?scan.threat,
                    "Turn short-circuited by scanner"
                );
                scratch.push(Message::assistant(REFUSAL_REPLY));
                *session = scratch;
                return Ok(REFUSAL_REPLY.to_string());
            }
        }

        let reply = self.run_loop(&mut scratch).await;
        *session = scratch;
        Ok(reply)
    }

    async fn run_loop(&self, session: &mut Session) -> String {
        for iteration in 0..self.settings.max_tool_iterations {
            let next = infer_state(&session.collected_data, &session.messages, &self.policy);
            if next != session.current_state && !validate_transition(session.current_state, next) {
                debug!(
                    thread_id = %session.thread_id,
                    from = ?session.current_state,
                    to = ?next,
                    "Re-projected state jumped outside the transition table"
                );
            }
            session.current_state = next;
            debug!(
                thread_id = %session.thread_id,
                state = ?session.current_state,
                iteration,
                "Turn iteration"
            );

            let system_prompt = compose_system_prompt(session.current_state);
            let history_budget = self
                .settings
                .token_budget
                .saturating_sub(estimate_tokens(&system_prompt));
            let mut window = vec![Message::system(system_prompt)];
            window.extend(trim(&session.messages, history_budget));

            let request = ModelRequest {
                model: self.settings.model.clone(),
                messages: window,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                tools: self.tools.definitions(),
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(thread_id = %session.thread_id, error = %e, "Provider call failed");
                    let message = if e.is_transport_fault()
                        && session.current_state.is_verification()
                    {
                        session.current_state = ConversationState::PostAction;
                        system_fault_message()
                    } else {
                        APOLOGY_REPLY.to_string()
                    };
                    session.push(Message::assistant(&message));
                    return message;
                }
            };

            let assistant = response.message;
            if !assistant.proposes_tools() {
                let text = finalize_reply(assistant.content, session, &self.policy);
                session.push(Message::assistant(&text));
                return text;
            }

            session.push(assistant.clone());
            let mut replies: Vec<ToolReply> = Vec::new();
            for proposal in &assistant.tool_calls {
                let arguments = serde_json::from_str(&proposal.arguments)
                    .unwrap_or(serde_json::Value::Null);
                let call = ToolCall {
                    id: proposal.id.clone(),
                    name: proposal.name.clone(),
                    arguments: arguments.clone(),
                };
                let reply = self.tools.dispatch(&call).await;
                harvest(session, &call.name, &arguments, &reply, &self.policy);
                session.push(Message::tool_result(&reply.call_id, reply.render()));
                replies.push(reply);
            }

            if session.current_state.is_verification() {
                if let Some(last) = replies.last() {
                    let decision = self.retry.observe(
                        session.current_state,
                        &last.render(),
                        &mut session.retry_counts,
                    );
                    if let EscalationDecision::Escalate { message } = decision {
                        info!(thread_id = %session.thread_id, "Verification escalated");
                        session.current_state = ConversationState::PostAction;
                        session.push(Message::assistant(&message));
                        return message;
                    }
                }
            }
        }

        warn!(thread_id = %session.thread_id, "Tool loop hit iteration bound");
        session.push(Message::assistant(FALLBACK_REPLY));
        FALLBACK_REPLY.to_string()
    }
}

/// Fold useful tool traffic into the collected data so the next turn's
/// state inference sees it.
fn harvest(
    session: &mut Session,
    tool_name: &str,
    arguments: &serde_json::Value,
    reply: &ToolReply,
    policy: &InferencePolicy,
) {
    let arg = |key: &str| {
        arguments[key]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut update = bookline_core::collected::CollectedData::default();
    match tool_name {
        "check_availability" => {
            update.service_id = arg("service_id");
        }
        "book_appointment" => {
            update.service_id = arg("service_id");
            update.date = arg("date");
            update.start_time = arg("start_time");
            update.client_name = arg("client_name");
            update.client_email = arg("client_email");
            update.client_phone = arg("client_phone");
            if reply.render().starts_with("[SUCCESS]") {
                update.confirmation_number = policy.find_confirmation(&reply.output);
            }
        }
        "validate_contact" => {
            if reply.render().starts_with("[VALID]") {
                update.client_email = arg("email");
                update.client_phone = arg("phone");
            }
        }
        _ => {}
    }
    session.collected_data.merge(update);
}

/// If the model's final text omits a freshly issued confirmation number,
/// append it so the customer always sees it.
fn finalize_reply(text: String, session: &Session, policy: &InferencePolicy) -> String {
    let newest_success_confirmation = session
        .messages
        .iter()
        .rev()
        .take(8)
        .find(|m| {
            m.role == bookline_core::message::Role::Tool
                && m.content.starts_with("[SUCCESS]")
                && policy.contains_confirmation_shape(&m.content)
        })
        .and_then(|m| policy.find_confirmation(&m.content));

    match newest_success_confirmation {
        Some(number) if !text.contains(&number) => {
            format!("{text}\n\nYour confirmation number is {number}.")
        }
        _ => text,
    }
}

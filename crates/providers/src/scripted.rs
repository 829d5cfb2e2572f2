//! Scripted provider — a deterministic test double.
//!
//! Replays a queue of canned responses in order. Tests that exercise the
//! orchestration loop use this to drive multi-turn conversations without a
//! live model.

use async_trait::async_trait;
use bookline_core::error::ProviderError;
use bookline_core::message::{Message, MessageToolCall};
use bookline_core::provider::{ModelProvider, ModelRequest, ModelResponse};
use std::sync::Mutex;

pub struct ScriptedProvider {
    responses: Mutex<Vec<ScriptedStep>>,
    /// Requests seen so far, for assertions on what the loop sent.
    requests: Mutex<Vec<ModelRequest>>,
}

enum ScriptedStep {
    Respond(ModelResponse),
    Fail(ProviderError),
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue an assistant text reply.
    pub fn push_text(&self, content: impl Into<String>) {
        self.push_response(ModelResponse {
            message: Message::assistant(content),
            usage: None,
            model: "scripted".into(),
        });
    }

    /// Queue an assistant reply that proposes a single tool call.
    pub fn push_tool_call(&self, name: impl Into<String>, arguments: serde_json::Value) {
        let call = MessageToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments: arguments.to_string(),
        };
        self.push_response(ModelResponse {
            message: Message::assistant_with_tool_calls("", vec![call]),
            usage: None,
            model: "scripted".into(),
        });
    }

    /// Queue a full response.
    pub fn push_response(&self, response: ModelResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push(ScriptedStep::Respond(response));
        }
    }

    /// Queue a provider failure.
    pub fn push_error(&self, error: ProviderError) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push(ScriptedStep::Fail(error));
        }
    }

    /// Requests the loop has sent so far.
    pub fn seen_requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, ProviderError> {
        let step = {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            let mut responses = self
                .responses
                .lock()
                .map_err(|_| ProviderError::NotConfigured("Scripted provider poisoned".into()))?;
            if responses.is_empty() {
                return Err(ProviderError::NotConfigured(
                    "Scripted provider ran out of responses".into(),
                ));
            }
            responses.remove(0)
        };
        match step {
            ScriptedStep::Respond(response) => Ok(response),
            ScriptedStep::Fail(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request() -> ModelRequest {
        ModelRequest {
            model: "scripted".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.2,
            max_tokens: None,
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn replays_in_order() {
        let provider = ScriptedProvider::new();
        provider.push_text("first");
        provider.push_text("second");

        let r1 = provider.complete(empty_request()).await.unwrap();
        let r2 = provider.complete(empty_request()).await.unwrap();
        assert_eq!(r1.message.content, "first");
        assert_eq!(r2.message.content, "second");
    }

    #[tokio::test]
    async fn errors_when_script_runs_dry() {
        let provider = ScriptedProvider::new();
        let err = provider.complete(empty_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn records_requests_for_assertions() {
        let provider = ScriptedProvider::new();
        provider.push_text("ok");
        provider.complete(empty_request()).await.unwrap();
        let seen = provider.seen_requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].content, "hi");
    }

    #[tokio::test]
    async fn replays_queued_failures() {
        let provider = ScriptedProvider::new();
        provider.push_error(ProviderError::Timeout("deadline exceeded".into()));
        let err = provider.complete(empty_request()).await.unwrap_err();
        assert!(err.is_transport_fault());
    }
}

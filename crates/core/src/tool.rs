//! Tool trait — the abstraction over the booking capabilities the model can
//! invoke.
//!
//! Every tool result is rendered as a short, model-consumable string
//! prefixed by an outcome tag. Dispatch never surfaces an error to the
//! orchestration loop: collaborator failures become `[ERROR]` strings so
//! the conversation can continue instead of crashing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Outcome tag prefixed onto every tool reply string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutcome {
    Success,
    Error,
    Valid,
    Invalid,
}

impl ToolOutcome {
    pub fn tag(&self) -> &'static str {
        match self {
            ToolOutcome::Success => "[SUCCESS]",
            ToolOutcome::Error => "[ERROR]",
            ToolOutcome::Valid => "[VALID]",
            ToolOutcome::Invalid => "[INVALID]",
        }
    }
}

/// The result of a tool execution, before rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReply {
    /// The call ID this reply is for
    pub call_id: String,

    /// Outcome classification
    pub outcome: ToolOutcome,

    /// Human/model-readable detail (without the tag prefix)
    pub output: String,
}

impl ToolReply {
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(call_id, ToolOutcome::Success, output)
    }

    pub fn error(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(call_id, ToolOutcome::Error, output)
    }

    pub fn valid(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(call_id, ToolOutcome::Valid, output)
    }

    pub fn invalid(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(call_id, ToolOutcome::Invalid, output)
    }

    fn new(call_id: impl Into<String>, outcome: ToolOutcome, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            outcome,
            output: output.into(),
        }
    }

    /// The tagged string sent back to the model, e.g.
    /// `[SUCCESS] Appointment booked. Confirmation: APT-3F9K2A`.
    pub fn render(&self) -> String {
        format!("{} {}", self.outcome.tag(), self.output)
    }
}

/// The core Tool trait.
///
/// Tools are registered in the `ToolRegistry` and made available to the
/// orchestration loop. Tools do not validate business rules themselves —
/// they forward to the appointment store and translate its response.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "list_services").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolReply, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, resolved once at startup.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        // Stable ordering keeps the request payload deterministic across calls
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Dispatch a tool call. Never returns an error: unknown tools and
    /// collaborator failures are converted into `[ERROR]` replies so the
    /// loop can continue. Mutating calls are never retried here.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolReply {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested by model");
            return ToolReply::error(&call.id, format!("Unknown tool: {}", call.name));
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(mut reply) => {
                reply.call_id = call.id.clone();
                reply
            }
            Err(ToolError::Timeout { tool_name, timeout_secs }) => {
                warn!(tool = %tool_name, timeout_secs, "Tool call timed out");
                ToolReply::error(
                    &call.id,
                    format!("Could not connect to booking API: timeout after {timeout_secs}s"),
                )
            }
            Err(ToolError::Upstream { tool_name, reason }) => {
                warn!(tool = %tool_name, error = %reason, "Upstream call failed");
                ToolReply::error(&call.id, format!("Could not connect to booking API: {reason}"))
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolReply::error(&call.id, e.to_string())
            }
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

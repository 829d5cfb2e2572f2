//! Configuration loading, validation, and management for Bookline.
//!
//! Loads configuration from a `bookline.toml` file with environment
//! variable overrides for secrets. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// The root configuration structure.
///
/// Maps directly to `bookline.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Appointment store API settings
    #[serde(default)]
    pub booking_api: BookingApiConfig,

    /// Orchestration loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Security scanner and rate limit settings
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            booking_api: BookingApiConfig::default(),
            agent: AgentConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (informational)
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL for the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key (prefer the BOOKLINE_API_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Overall request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingApiConfig {
    /// Base URL of the appointment store HTTP API
    #[serde(default = "default_booking_url")]
    pub base_url: String,

    /// Per-call timeout in seconds (no internal retry)
    #[serde(default = "default_booking_timeout")]
    pub timeout_secs: u64,
}

impl Default for BookingApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_booking_url(),
            timeout_secs: default_booking_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Token budget for the context window sent to the model
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Maximum tool-call iterations per turn (safety limit)
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            max_tool_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Whether the prompt-injection scanner runs before each model call
    #[serde(default = "default_true")]
    pub scanner_enabled: bool,

    /// Allowed requests per org per minute
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            scanner_enabled: true,
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_provider_timeout() -> u64 {
    60
}
fn default_booking_url() -> String {
    "http://localhost:8000".into()
}
fn default_booking_timeout() -> u64 {
    10
}
fn default_token_budget() -> usize {
    4096
}
fn default_max_iterations() -> u32 {
    8
}
fn default_true() -> bool {
    true
}
fn default_rate_limit() -> u32 {
    60
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("booking_api", &self.booking_api)
            .field("agent", &self.agent)
            .field("security", &self.security)
            .finish()
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config: AppConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.apply_env_overrides();
        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults plus env overrides, for when no config file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("BOOKLINE_API_KEY") {
            if !key.is_empty() {
                self.provider.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("BOOKLINE_BOOKING_API_URL") {
            if !url.is_empty() {
                self.booking_api.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("BOOKLINE_MODEL") {
            if !model.is_empty() {
                self.provider.model = model;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.token_budget < 256 {
            return Err(ConfigError::Invalid(
                "agent.token_budget must be at least 256".into(),
            ));
        }
        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_tool_iterations must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Invalid(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}

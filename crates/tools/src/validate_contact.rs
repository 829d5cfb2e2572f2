//! Pure format checks for contact details. No network; results are memoized
//! since the model tends to re-validate the same value across turns.

use async_trait::async_trait;
use bookline_core::error::ToolError;
use bookline_core::tool::{Tool, ToolReply};
use std::time::Duration;

use crate::cache::BoundedCache;

const CACHE_CAPACITY: usize = 256;
const CACHE_TTL: Duration = Duration::from_secs(600);

pub struct ValidateContactTool {
    cache: BoundedCache<String, bool>,
}

impl ValidateContactTool {
    pub fn new() -> Self {
        Self {
            cache: BoundedCache::new(CACHE_CAPACITY, CACHE_TTL),
        }
    }
}

impl Default for ValidateContactTool {
    fn default() -> Self {
        Self::new()
    }
}

/// One "@", non-empty local part, and a dot somewhere after the "@".
fn email_is_valid(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let Some(domain) = parts.next() else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
}

/// At least 7 digits; separators and a leading "+" are tolerated.
fn phone_is_valid(phone: &str) -> bool {
    let mut digits = 0usize;
    for (i, c) in phone.chars().enumerate() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' | '.' => {}
            '+' if i == 0 => {}
            _ => return false,
        }
    }
    digits >= 7
}

#[async_trait]
impl Tool for ValidateContactTool {
    fn name(&self) -> &str {
        "validate_contact"
    }

    fn description(&self) -> &str {
        "Check whether an email address or phone number is plausibly formatted. Pass exactly one of 'email' or 'phone'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "email": { "type": "string" },
                "phone": { "type": "string" }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolReply, ToolError> {
        let (kind, value) = match (arguments["email"].as_str(), arguments["phone"].as_str()) {
            (Some(email), None) => ("email", email),
            (None, Some(phone)) => ("phone", phone),
            _ => {
                return Err(ToolError::InvalidArguments(
                    "Pass exactly one of 'email' or 'phone'".into(),
                ));
            }
        };

        let key = format!("{kind}:{value}");
        let valid = match self.cache.get(&key) {
            Some(cached) => cached,
            None => {
                let valid = match kind {
                    "email" => email_is_valid(value),
                    _ => phone_is_valid(value),
                };
                self.cache.insert(key, valid);
                valid
            }
        };

        if valid {
            Ok(ToolReply::valid(
                "",
                format!("{kind} looks well-formed: {value}"),
            ))
        } else {
            Ok(ToolReply::invalid(
                "",
                format!("invalid format for {kind}: {value}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_plausible_email() {
        let tool = ValidateContactTool::new();
        let reply = tool
            .execute(serde_json::json!({"email": "dana@example.com"}))
            .await
            .unwrap();
        assert!(reply.render().starts_with("[VALID]"));
    }

    #[tokio::test]
    async fn rejects_email_without_domain_dot() {
        let tool = ValidateContactTool::new();
        let reply = tool
            .execute(serde_json::json!({"email": "dana@example"}))
            .await
            .unwrap();
        assert!(reply.render().starts_with("[INVALID] invalid format for email"));
    }

    #[tokio::test]
    async fn accepts_formatted_phone_numbers() {
        let tool = ValidateContactTool::new();
        for phone in ["+1 (555) 010-0199", "5550100", "555-010-0199"] {
            let reply = tool
                .execute(serde_json::json!({"phone": phone}))
                .await
                .unwrap();
            assert!(reply.render().starts_with("[VALID]"), "{phone}");
        }
    }

    #[tokio::test]
    async fn rejects_short_or_alphabetic_phones() {
        let tool = ValidateContactTool::new();
        for phone in ["12345", "call me", "+1 555 ABC 0199"] {
            let reply = tool
                .execute(serde_json::json!({"phone": phone}))
                .await
                .unwrap();
            assert!(reply.render().starts_with("[INVALID]"), "{phone}");
        }
    }

    #[tokio::test]
    async fn both_or_neither_argument_is_rejected() {
        let tool = ValidateContactTool::new();
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = tool
            .execute(serde_json::json!({"email": "a@b.com", "phone": "5550100"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

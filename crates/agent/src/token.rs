//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, accurate
//! within ~10% for BPE tokenizers on English text. Exact counts do not
//! matter here; the window manager only needs a stable, monotonic measure.

use bookline_core::message::Message;

/// Per-message wire-format overhead (role name, delimiters).
pub const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single message including overhead. Tool-call
/// proposals count via their serialized arguments.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let calls: usize = message
        .tool_calls
        .iter()
        .map(|tc| estimate_tokens(&tc.name) + estimate_tokens(&tc.arguments))
        .sum();
    MESSAGE_OVERHEAD + estimate_tokens(&message.content) + calls
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::message::MessageToolCall;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn message_includes_overhead() {
        let msg = Message::user("test");
        assert_eq!(estimate_message_tokens(&msg), 5);
    }

    #[test]
    fn tool_calls_are_counted() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "list".into(), // 1 token
                arguments: "{}".into(), // 1 token
            }],
        );
        assert_eq!(estimate_message_tokens(&msg), MESSAGE_OVERHEAD + 2);
    }

    #[test]
    fn slice_sums_per_message() {
        let msgs = vec![Message::user("hello"), Message::assistant("ok")];
        assert_eq!(
            estimate_messages_tokens(&msgs),
            estimate_message_tokens(&msgs[0]) + estimate_message_tokens(&msgs[1])
        );
    }
}

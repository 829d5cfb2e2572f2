//! Context window manager.
//!
//! Bounds the conversation sent to the model. The trim is structural, not
//! just positional: an assistant message proposing tool calls and the tool
//! results answering it move as one unit, and a call id with no matching
//! result is stripped before anything goes downstream. Trimming never
//! fails; in the worst case the newest content is truncated to fit.

use bookline_core::message::{Message, Role};
use std::collections::HashSet;

use crate::token::{estimate_message_tokens, estimate_messages_tokens, estimate_tokens};

/// Produce a bounded window over `messages`. The system message (wherever it
/// sits) is always retained and placed first; remaining history is dropped
/// oldest-first to fit `token_budget`.
pub fn trim(messages: &[Message], token_budget: usize) -> Vec<Message> {
    let mut system: Option<Message> = None;
    let mut rest: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == Role::System {
            if system.is_none() {
                system = Some(message.clone());
            }
        } else {
            rest.push(message.clone());
        }
    }

    let system_tokens = system.as_ref().map(estimate_message_tokens).unwrap_or(0);
    let budget = token_budget.saturating_sub(system_tokens);

    let groups = group_messages(rest);

    // Select newest-first. The newest group is always kept, truncated to
    // fit if it alone exceeds the budget.
    let mut kept_rev: Vec<Vec<Message>> = Vec::new();
    let mut used = 0usize;
    for group in groups.into_iter().rev() {
        let cost = estimate_messages_tokens(&group);
        if kept_rev.is_empty() {
            let group = if cost > budget {
                truncate_group(group, budget)
            } else {
                group
            };
            used += estimate_messages_tokens(&group);
            kept_rev.push(group);
        } else if used + cost <= budget {
            used += cost;
            kept_rev.push(group);
        } else {
            break;
        }
    }
    kept_rev.reverse();

    // Soft preference: start the window on a user turn.
    if kept_rev.iter().any(|g| g[0].role == Role::User) {
        while kept_rev.len() > 1 && kept_rev[0][0].role != Role::User {
            kept_rev.remove(0);
        }
    }

    let mut window = Vec::new();
    if let Some(system) = system {
        window.push(system);
    }
    for group in kept_rev {
        window.extend(group);
    }
    window
}

/// Partition messages into atomic units: a tool-proposing assistant message
/// travels with its results. Orphan tool results are dropped; an assistant
/// message whose calls are not all answered keeps its text but loses its
/// `tool_calls`.
fn group_messages(messages: Vec<Message>) -> Vec<Vec<Message>> {
    let mut groups: Vec<Vec<Message>> = Vec::new();
    let mut iter = messages.into_iter().peekable();

    while let Some(message) = iter.next() {
        match message.role {
            // A tool result with no preceding proposal has nothing to pair with.
            Role::Tool => {}
            Role::Assistant if message.proposes_tools() => {
                let ids: HashSet<String> =
                    message.tool_calls.iter().map(|c| c.id.clone()).collect();
                let mut results: Vec<Message> = Vec::new();
                while iter.peek().is_some_and(|m| m.role == Role::Tool) {
                    let Some(result) = iter.next() else { break };
                    let matches = result
                        .tool_call_id
                        .as_deref()
                        .is_some_and(|id| ids.contains(id));
                    if matches {
                        results.push(result);
                    }
                }

                let answered: HashSet<&str> = results
                    .iter()
                    .filter_map(|r| r.tool_call_id.as_deref())
                    .collect();
                let mut head = message;
                if !ids.iter().all(|id| answered.contains(id.as_str())) {
                    head.tool_calls = Vec::new();
                    results.clear();
                }

                let mut group = vec![head];
                group.extend(results);
                groups.push(group);
            }
            _ => groups.push(vec![message]),
        }
    }
    groups
}

/// Truncate message contents within a group to fit the budget, keeping every
/// message so call/result pairing stays intact.
fn truncate_group(mut group: Vec<Message>, budget: usize) -> Vec<Message> {
    let mut remaining = budget;
    for message in group.iter_mut() {
        let cost = estimate_message_tokens(message);
        if cost <= remaining {
            remaining -= cost;
            continue;
        }
        let fixed = cost - estimate_tokens(&message.content);
        let content_tokens = remaining.saturating_sub(fixed);
        message.content = truncate_chars(&message.content, content_tokens * 4);
        remaining = remaining.saturating_sub(fixed + estimate_tokens(&message.content));
    }
    group
}

fn truncate_chars(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

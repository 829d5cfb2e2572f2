//! Per-organization rate limiting — fixed one-minute windows.
//!
//! Counters are kept in-process. Checks are synchronous and cheap; the
//! limiter is shared across sessions of the same org but holds no
//! per-session state.

use bookline_core::error::SecurityError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(60);

struct WindowState {
    started: Instant,
    count: u32,
}

/// Fixed-window request limiter keyed by org id.
pub struct RateLimiter {
    limit_per_minute: u32,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit_per_minute,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request for `org_id`. Returns `Err(RateLimited)` with a
    /// retry-after hint once the window's budget is spent.
    pub fn check(&self, org_id: &str) -> Result<(), SecurityError> {
        let now = Instant::now();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let state = windows.entry(org_id.to_string()).or_insert(WindowState {
            started: now,
            count: 0,
        });

        if now.duration_since(state.started) >= WINDOW {
            state.started = now;
            state.count = 0;
        }

        if state.count >= self.limit_per_minute {
            let elapsed = now.duration_since(state.started);
            let retry_after_secs = WINDOW.saturating_sub(elapsed).as_secs().max(1);
            warn!(org_id, retry_after_secs, "Rate limit exceeded");
            return Err(SecurityError::RateLimited {
                org_id: org_id.to_string(),
                retry_after_secs,
            });
        }

        state.count += 1;
        Ok(())
    }
}

//! Security module for Bookline — prompt-injection scanning and rate limiting.
//!
//! Provides:
//! - **Scanner**: pattern + encoding based screening of user input, run once
//!   per turn before the model call
//! - **Rate limiter**: fixed-window per-org request budgets

pub mod rate_limit;
pub mod scanner;

pub use rate_limit::RateLimiter;
pub use scanner::{ScanResult, SecurityScanner, ThreatKind};

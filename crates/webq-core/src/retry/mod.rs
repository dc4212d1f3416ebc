//! Retry policy.
//!
//! Only loss of connectivity is retried, at a fixed interval and up to the
//! descriptor's `max_retries`. Transport errors and cancellations are final.

mod classify;
mod policy;

pub use classify::{classify_curl_error, is_retryable};
pub use policy::{RetryDecision, RetryPolicy, DEFAULT_RETRY_DELAY};

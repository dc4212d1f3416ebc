use std::time::Duration;

use crate::event::FailureKind;

use super::classify::is_retryable;

/// Fixed delay between offline retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop and report the failure.
    GiveUp,
    /// Try again after the given delay.
    RetryAfter(Duration),
}

/// Fixed-interval retry policy.
///
/// The delay is the same for every attempt; the bound comes from each
/// descriptor's `max_retries`, not from the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Decide what to do after `attempt` failed with `kind`.
    ///
    /// `attempt` is 1-based. With `max_retries = N` this retries after
    /// attempts 1..=N, so N retries happen before giving up.
    pub fn decide(&self, attempt: u32, max_retries: u32, kind: FailureKind) -> RetryDecision {
        if !is_retryable(kind) || attempt > max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay)
    }
}

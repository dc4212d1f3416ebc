//! Lifecycle events delivered to a descriptor's callback.
//!
//! Every submitted request sees exactly one `Start`, zero or more `Retry`,
//! then exactly one `End`.

use std::fmt;

/// Message reported while the connectivity probe says the network is down.
pub const OFFLINE_MESSAGE: &str = "Internet connection appears to be offline";

/// Status code attached to synthetic offline events (no HTTP exchange happened).
pub const OFFLINE_CODE: u16 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    Start,
    /// The network was unreachable; another attempt is scheduled.
    Retry {
        /// The attempt that just failed (1-based).
        attempt: u32,
        reason: String,
        code: u16,
    },
    End {
        outcome: Outcome,
    },
}

impl RequestEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestEvent::End { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connectivity probe reported unreachable and retries were exhausted.
    Offline,
    /// Transport reported an error.
    Transport,
    /// The in-flight call was cancelled (preempted or shut down).
    Cancelled,
    /// Parameters or target could not be turned into a request.
    Encoding,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Offline => "offline",
            FailureKind::Transport => "transport",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Encoding => "encoding",
        };
        f.write_str(s)
    }
}

/// Terminal result of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A response arrived. Non-2xx statuses are still a success here; the
    /// caller interprets the status.
    Success { data: Vec<u8>, status: u16 },
    Failure {
        kind: FailureKind,
        message: String,
        status: Option<u16>,
    },
}

impl Outcome {
    pub(crate) fn offline() -> Self {
        Outcome::Failure {
            kind: FailureKind::Offline,
            message: OFFLINE_MESSAGE.to_string(),
            status: Some(OFFLINE_CODE),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Outcome::Failure {
            kind: FailureKind::Cancelled,
            message: "request cancelled".to_string(),
            status: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

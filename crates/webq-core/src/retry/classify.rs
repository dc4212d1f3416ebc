//! Classify failures for retry decisions.

use crate::event::FailureKind;

/// Only connectivity loss is retried.
pub fn is_retryable(kind: FailureKind) -> bool {
    matches!(kind, FailureKind::Offline)
}

/// Classify a curl error. An abort from our own progress callback is a
/// cancellation; everything else (timeouts included) is a transport failure.
pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_aborted_by_callback() {
        return FailureKind::Cancelled;
    }
    FailureKind::Transport
}

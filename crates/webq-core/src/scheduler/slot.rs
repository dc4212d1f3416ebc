//! The single execution slot.

use tokio::task::JoinHandle;

use crate::request::Priority;
use crate::transport::CancelToken;

/// What the slot occupant is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connectivity probe is running.
    Probing,
    /// Offline; waiting for the retry timer.
    WaitingRetry,
    /// Transport call in flight.
    InFlight,
}

/// State of the currently executing descriptor. The descriptor itself stays
/// at the head of the queue named by `priority`.
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) priority: Priority,
    /// 1-based attempt counter; reset whenever a new descriptor takes the slot.
    pub(super) attempt: u32,
    /// Distinguishes this occupant's completions from stale ones.
    pub(super) generation: u64,
    pub(super) phase: Phase,
    pub(super) cancel: CancelToken,
    pub(super) timer: Option<JoinHandle<()>>,
}

impl Slot {
    pub(super) fn new(priority: Priority, generation: u64) -> Self {
        Self {
            priority,
            attempt: 1,
            generation,
            phase: Phase::Probing,
            cancel: CancelToken::new(),
            timer: None,
        }
    }
}

/// Leaving the slot cancels whatever the occupant still has pending.
impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.cancel.cancel();
    }
}

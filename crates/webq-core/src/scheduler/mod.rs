//! Request scheduler.
//!
//! Serializes outbound requests through two FIFO queues (high, low) and a
//! single execution slot:
//!
//! - at most one request executes at a time;
//! - a high request runs to completion undisturbed;
//! - a low request is cancelled as soon as high work is pending, and is then
//!   finished as cancelled (it is not re-queued);
//! - while the connectivity probe reports offline, the occupant is retried
//!   at a fixed interval up to its `max_retries`, without touching the queues.
//!
//! The scheduler is a tokio task; [`Scheduler`] is a cloneable handle to it.

mod actor;
mod queue;
mod slot;


pub use slot::Phase;

use tokio::sync::{mpsc, oneshot};

use crate::probe::ConnectivityProbe;
use crate::request::{Priority, RequestDescriptor};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

use actor::{Actor, Command};

/// Returned when talking to a scheduler that has been shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scheduler is shut down")]
pub struct SchedulerClosed;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerOptions {
    pub retry: RetryPolicy,
}

/// Point-in-time view of the scheduler. Queue lengths include the
/// executing request, which stays at the head of its queue until it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub high: usize,
    pub low: usize,
    pub active: Option<ActiveSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSnapshot {
    pub priority: Priority,
    pub attempt: u32,
    pub phase: Phase,
    /// Preemption was requested and the completion has not arrived yet.
    pub cancelled: bool,
}

/// Handle to a running scheduler.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<Command>,
}

impl Scheduler {
    /// Start a scheduler on the current tokio runtime.
    ///
    /// It runs until [`Scheduler::shutdown`] is called or every handle is dropped.
    pub fn spawn<P, T>(probe: P, transport: T, options: SchedulerOptions) -> Self
    where
        P: ConnectivityProbe,
        T: Transport,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor::new(probe, transport, options.retry, tx.downgrade());
        tokio::spawn(actor.run(rx));
        Self { tx }
    }

    /// Queue a request. Results arrive only through the descriptor's callback,
    /// which is called from the scheduler task and must not block.
    pub fn submit(&self, desc: RequestDescriptor) -> Result<(), SchedulerClosed> {
        self.tx
            .send(Command::Submit(desc))
            .map_err(|_| SchedulerClosed)
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot, SchedulerClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .map_err(|_| SchedulerClosed)?;
        rx.await.map_err(|_| SchedulerClosed)
    }

    /// Stop the scheduler. The active request, if any, is cancelled and gets
    /// `End(Failure{Cancelled})`; requests that never started are dropped
    /// without events.
    /// Returns once the scheduler has stopped; a no-op if it already has.
    pub async fn shutdown(&self) {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

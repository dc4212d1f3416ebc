//! Scheduler task: owns the queues and the slot, and runs the
//! dispatch / execute / complete state machine.
//!
//! Everything here runs on one task, so queue and slot mutation is serialized.
//! Probe, transport and retry timers run on their own tasks and report back
//! through the command channel, tagged with the slot generation they belong to.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::encoder;
use crate::event::{FailureKind, Outcome, RequestEvent, OFFLINE_CODE, OFFLINE_MESSAGE};
use crate::probe::ConnectivityProbe;
use crate::request::{Priority, RequestDescriptor};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::{Transport, TransportOutcome};

use super::queue::PriorityQueues;
use super::slot::{Phase, Slot};
use super::{ActiveSnapshot, QueueSnapshot};

pub(super) enum Command {
    Submit(RequestDescriptor),
    ProbeDone { generation: u64, reachable: bool },
    RetryDue { generation: u64 },
    TransportDone { generation: u64, outcome: TransportOutcome },
    Snapshot(oneshot::Sender<QueueSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

pub(super) struct Actor<P, T> {
    probe: Arc<P>,
    transport: Arc<T>,
    retry: RetryPolicy,
    queues: PriorityQueues,
    slot: Option<Slot>,
    next_generation: u64,
    /// Weak so that dropping every `Scheduler` handle stops the task.
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl<P: ConnectivityProbe, T: Transport> Actor<P, T> {
    pub(super) fn new(
        probe: P,
        transport: T,
        retry: RetryPolicy,
        commands: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            probe: Arc::new(probe),
            transport: Arc::new(transport),
            retry,
            queues: PriorityQueues::default(),
            slot: None,
            next_generation: 0,
            commands,
        }
    }

    pub(super) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Submit(desc) => self.submit(desc),
                Command::ProbeDone {
                    generation,
                    reachable,
                } => self.on_probe_done(generation, reachable),
                Command::RetryDue { generation } => self.on_retry_due(generation),
                Command::TransportDone {
                    generation,
                    outcome,
                } => self.on_transport_done(generation, outcome),
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::Shutdown(ack) => {
                    self.teardown();
                    rx.close();
                    let _ = ack.send(());
                    return;
                }
            }
        }
        tracing::debug!("all scheduler handles dropped; stopping");
        self.teardown();
    }

    fn submit(&mut self, desc: RequestDescriptor) {
        tracing::debug!(
            verb = %desc.verb,
            target = %desc.target.location(),
            priority = ?desc.priority,
            "request queued"
        );
        self.queues.push(desc);
        self.dispatch();
    }

    /// Decide what should run next. Runs after every submission and every
    /// terminal outcome.
    fn dispatch(&mut self) {
        if let Some(slot) = &self.slot {
            if slot.priority == Priority::Low && self.queues.has_high() && !slot.cancel.is_cancelled() {
                tracing::debug!(generation = slot.generation, "preempting low-priority request");
                slot.cancel.cancel();
            }
            // The occupant keeps the slot until its completion arrives.
            return;
        }

        let Some(priority) = self.queues.next_priority() else {
            return;
        };
        self.next_generation += 1;
        let slot = Slot::new(priority, self.next_generation);
        tracing::debug!(generation = slot.generation, ?priority, "request started");
        self.slot = Some(slot);
        self.emit(RequestEvent::Start);
        self.begin_probe();
    }

    fn begin_probe(&mut self) {
        let Some(slot) = self.slot.as_mut() else {
            return;
        };
        slot.phase = Phase::Probing;
        let generation = slot.generation;
        let probe = Arc::clone(&self.probe);
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let reachable = tokio::task::spawn_blocking(move || probe.is_reachable())
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("connectivity probe task failed: {}", e);
                    false
                });
            send(&commands, Command::ProbeDone {
                generation,
                reachable,
            });
        });
    }

    fn on_probe_done(&mut self, generation: u64, reachable: bool) {
        let Some(slot) = self.current(generation) else {
            return;
        };
        if slot.cancel.is_cancelled() {
            self.finish(Outcome::cancelled());
            return;
        }
        if !reachable {
            self.on_offline();
            return;
        }

        let Some(desc) = self.occupant() else {
            return;
        };
        let request = match encoder::build_request(desc) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(target = %desc.target.location(), "cannot build request: {}", e);
                self.finish(Outcome::Failure {
                    kind: FailureKind::Encoding,
                    message: e.to_string(),
                    status: None,
                });
                return;
            }
        };

        let Some(slot) = self.slot.as_mut() else {
            return;
        };
        slot.phase = Phase::InFlight;
        let cancel = slot.cancel.clone();
        let transport = Arc::clone(&self.transport);
        let commands = self.commands.clone();
        tracing::debug!(generation, method = %request.method, url = %request.url, "sending request");
        tokio::spawn(async move {
            let outcome = transport.execute(request, cancel).await;
            send(&commands, Command::TransportDone {
                generation,
                outcome,
            });
        });
    }

    fn on_offline(&mut self) {
        let (Some(slot), Some(desc)) = (self.slot.as_ref(), self.occupant()) else {
            return;
        };
        let attempt = slot.attempt;
        match self.retry.decide(attempt, desc.max_retries, FailureKind::Offline) {
            RetryDecision::GiveUp => {
                tracing::info!(attempt, "offline; giving up");
                self.finish(Outcome::offline());
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(attempt, ?delay, "offline; retrying");
                self.emit(RequestEvent::Retry {
                    attempt,
                    reason: OFFLINE_MESSAGE.to_string(),
                    code: OFFLINE_CODE,
                });
                let Some(slot) = self.slot.as_mut() else {
                    return;
                };
                slot.attempt += 1;
                slot.phase = Phase::WaitingRetry;
                let generation = slot.generation;
                let cancel = slot.cancel.clone();
                let commands = self.commands.clone();
                slot.timer = Some(tokio::spawn(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                    send(&commands, Command::RetryDue { generation });
                }));
            }
        }
    }

    fn on_retry_due(&mut self, generation: u64) {
        let Some(slot) = self.current_mut(generation) else {
            return;
        };
        slot.timer = None;
        if slot.cancel.is_cancelled() {
            self.finish(Outcome::cancelled());
            return;
        }
        self.begin_probe();
    }

    fn on_transport_done(&mut self, generation: u64, outcome: TransportOutcome) {
        if self.current(generation).is_none() {
            return;
        }
        self.finish(outcome.into());
    }

    /// Emit END, pop the finished descriptor, free the slot, dispatch again.
    fn finish(&mut self, outcome: Outcome) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        match &outcome {
            Outcome::Success { status, .. } => {
                tracing::info!(generation = slot.generation, status, "request finished")
            }
            Outcome::Failure { kind, message, .. } => {
                tracing::info!(generation = slot.generation, %kind, "request failed: {}", message)
            }
        }
        if let Some(desc) = self.queues.pop(slot.priority) {
            desc.emit(RequestEvent::End { outcome });
        }
        drop(slot);
        self.dispatch();
    }

    fn emit(&self, event: RequestEvent) {
        if let Some(desc) = self.occupant() {
            desc.emit(event);
        }
    }

    fn occupant(&self) -> Option<&RequestDescriptor> {
        let slot = self.slot.as_ref()?;
        self.queues.head(slot.priority)
    }

    fn current(&self, generation: u64) -> Option<&Slot> {
        match &self.slot {
            Some(slot) if slot.generation == generation => Some(slot),
            _ => {
                tracing::debug!(generation, "ignoring stale completion");
                None
            }
        }
    }

    fn current_mut(&mut self, generation: u64) -> Option<&mut Slot> {
        match &mut self.slot {
            Some(slot) if slot.generation == generation => Some(slot),
            _ => {
                tracing::debug!(generation, "ignoring stale completion");
                None
            }
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            high: self.queues.len(Priority::High),
            low: self.queues.len(Priority::Low),
            active: self.slot.as_ref().map(|slot| ActiveSnapshot {
                priority: slot.priority,
                attempt: slot.attempt,
                phase: slot.phase,
                cancelled: slot.cancel.is_cancelled(),
            }),
        }
    }

    /// Cancel the occupant (it gets END, having seen START) and drop
    /// everything still queued without events.
    fn teardown(&mut self) {
        if let Some(slot) = self.slot.take() {
            tracing::debug!(generation = slot.generation, "cancelling active request on shutdown");
            if let Some(desc) = self.queues.pop(slot.priority) {
                desc.emit(RequestEvent::End {
                    outcome: Outcome::cancelled(),
                });
            }
            // Dropping the slot aborts its retry timer and cancels its token.
            drop(slot);
        }
        let dropped = self.queues.len(Priority::High) + self.queues.len(Priority::Low);
        self.queues.clear();
        if dropped > 0 {
            tracing::warn!(dropped, "scheduler stopped with requests still queued");
        }
    }
}

fn send(commands: &mpsc::WeakUnboundedSender<Command>, cmd: Command) {
    // Upgrade fails once the scheduler has stopped; the result is no longer wanted.
    if let Some(tx) = commands.upgrade() {
        let _ = tx.send(cmd);
    }
}

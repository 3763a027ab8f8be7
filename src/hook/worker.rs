//! Worker thread driving delivery.
//!
//! A single worker dequeues payloads in FIFO order and runs the retry policy
//! for each one before moving to the next. Every payload's sequence ends with
//! exactly one decrement of the pending counter.

use std::{
    cell::Cell,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread,
};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::warn;

use crate::rate_limited_warner::RateLimitedWarner;

use super::{
    config::{FailureCallback, HookConfig},
    pending::{PendingTicket, PendingTracker},
    retry::{CancelToken, DeliveryOutcome, RetryPolicy},
    transport::{Transport, TransportError},
};

/// Name given to the delivery thread.
pub const WORKER_THREAD_NAME: &str = "femtogelf-worker";

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is a delivery worker.
///
/// Anything that would feed records back into a hook must refuse to do so
/// here: the worker blocking on its own full queue never wakes up.
#[cfg(any(test, feature = "log-compat"))]
pub fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

/// A serialized envelope together with its pending-work ticket.
#[derive(Debug)]
pub struct QueuedPayload {
    pub bytes: Vec<u8>,
    pub ticket: PendingTicket,
}

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum WorkerCommand {
    Payload(QueuedPayload),
    Shutdown,
}

/// Observable state of the delivery worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting on the queue.
    Idle,
    /// Running the retry policy for one payload.
    Delivering,
    /// The worker has exited.
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Delivering,
            _ => Self::Stopped,
        }
    }
}

/// Atomic cell shared between the worker and the hook.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl Default for StateCell {
    fn default() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }
}

impl StateCell {
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Why a payload was given up on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Every attempt failed.
    Exhausted,
    /// The hook was configured with zero attempts.
    NoAttempts,
    /// An abandoning shutdown discarded the payload.
    Abandoned,
}

/// Details of a payload that will never reach the collector.
#[derive(Clone, Debug)]
pub struct DeliveryFailure {
    /// The serialized envelope.
    pub payload: Vec<u8>,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Error from the final attempt, if any attempt was made.
    pub last_error: Option<TransportError>,
    pub reason: FailureReason,
}

/// State shared between the hook handle and its worker.
pub struct SharedState {
    pub pending: Arc<PendingTracker>,
    pub cancel: CancelToken,
    pub state: StateCell,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            pending: PendingTracker::new(),
            cancel: CancelToken::new(),
            state: StateCell::default(),
        }
    }
}

/// Spawns the delivery worker.
///
/// # Returns
///
/// A tuple containing:
/// * A sender for submitting [`WorkerCommand`]s to the worker
/// * A join handle for the spawned thread
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_worker(
    config: &HookConfig,
    shared: Arc<SharedState>,
) -> std::io::Result<(Sender<WorkerCommand>, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded(config.capacity);
    let worker = Worker {
        url: config.url.clone(),
        transport: Arc::clone(&config.transport),
        retry: config.retry,
        on_failure: config.on_failure.clone(),
        warner: RateLimitedWarner::new(config.warn_interval),
        shared,
    };
    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.into())
        .spawn(move || worker.run(rx))?;
    Ok((tx, handle))
}

struct Worker {
    url: String,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    on_failure: Option<FailureCallback>,
    warner: RateLimitedWarner,
    shared: Arc<SharedState>,
}

impl Worker {
    fn run(self, rx: Receiver<WorkerCommand>) {
        ON_WORKER.with(|flag| flag.set(true));
        loop {
            match rx.recv() {
                Ok(WorkerCommand::Payload(payload)) => self.handle_payload(payload),
                Ok(WorkerCommand::Shutdown) | Err(_) => {
                    self.drain_pending(&rx);
                    break;
                }
            }
        }
        self.warner.flush(|count| {
            warn!("FemtoGelfHook dropped {count} payloads before shutdown");
        });
        self.shared.state.set(WorkerState::Stopped);
    }

    /// Process whatever was queued behind the shutdown command.
    ///
    /// The hook drops its sender before waiting on the worker, so the channel
    /// disconnects once every producer still inside `fire` has finished
    /// sending. Stopping at the first empty read would strand their payloads.
    fn drain_pending(&self, rx: &Receiver<WorkerCommand>) {
        while let Ok(command) = rx.recv() {
            if let WorkerCommand::Payload(payload) = command {
                self.handle_payload(payload);
            }
        }
    }

    fn handle_payload(&self, payload: QueuedPayload) {
        let QueuedPayload { bytes, ticket } = payload;
        self.shared.state.set(WorkerState::Delivering);
        let outcome = if self.shared.cancel.is_cancelled() {
            DeliveryOutcome::Cancelled {
                attempts: 0,
                last_error: None,
            }
        } else {
            self.retry
                .deliver(self.transport.as_ref(), &self.url, &bytes, &self.shared.cancel)
        };
        self.report(bytes, outcome);
        drop(ticket);
        self.shared.state.set(WorkerState::Idle);
    }

    fn report(&self, payload: Vec<u8>, outcome: DeliveryOutcome) {
        let failure = match outcome {
            DeliveryOutcome::Delivered { .. } => return,
            DeliveryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                self.warn_drop(|count| {
                    warn!(
                        "FemtoGelfHook dropped {count} payloads after {attempts} failed attempts; \
                         last error: {last_error}"
                    );
                });
                DeliveryFailure {
                    payload,
                    attempts,
                    last_error: Some(last_error),
                    reason: FailureReason::Exhausted,
                }
            }
            DeliveryOutcome::NoAttempts => {
                self.warn_drop(|count| {
                    warn!(
                        "FemtoGelfHook discarded {count} payloads because retries are disabled"
                    );
                });
                DeliveryFailure {
                    payload,
                    attempts: 0,
                    last_error: None,
                    reason: FailureReason::NoAttempts,
                }
            }
            DeliveryOutcome::Cancelled {
                attempts,
                last_error,
            } => {
                self.warner.record_drop();
                DeliveryFailure {
                    payload,
                    attempts,
                    last_error,
                    reason: FailureReason::Abandoned,
                }
            }
        };
        if let Some(callback) = &self.on_failure {
            callback(&failure);
        }
    }

    fn warn_drop(&self, log: impl FnMut(u64)) {
        self.warner.record_drop();
        self.warner.warn_if_due(log);
    }
}

//! Public hook type exported by the crate.

use std::{collections::BTreeMap, sync::Arc, thread, time::Duration};

use crossbeam_channel::Sender;
use log::warn;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::{
    level::FemtoLevel, log_record::FemtoLogRecord, rate_limited_warner::RateLimitedWarner,
};

use super::{
    builder::GelfHookBuilder,
    config::{HookConfig, HookIdentity},
    envelope::encode_envelope,
    error::{HookBuildError, HookError},
    transport::Transport,
    worker::{QueuedPayload, SharedState, WorkerCommand, WorkerState, spawn_worker},
};

/// How [`FemtoGelfHook::shutdown`] treats payloads still in the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Deliver everything already queued, with the usual retries.
    #[default]
    Drain,
    /// Cut short any backoff and discard queued payloads.
    Abandon,
}

/// Hook forwarding records to a GELF-style HTTP collector.
///
/// `fire` encodes on the caller's thread and enqueues the bytes; a single
/// worker thread delivers them in order. When the queue is full `fire`
/// blocks until the worker frees a slot.
pub struct FemtoGelfHook {
    identity: HookIdentity,
    min_level: FemtoLevel,
    tx: RwLock<Option<Sender<WorkerCommand>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    shared: Arc<SharedState>,
    warner: RateLimitedWarner,
}

impl FemtoGelfHook {
    /// Start building a hook that posts to `url`.
    pub fn builder(url: impl Into<String>) -> GelfHookBuilder {
        GelfHookBuilder::new(url)
    }

    /// Build a hook with `max_retries` attempts per payload and the given
    /// extra fields, resolving host and facility from the environment.
    ///
    /// When `transport` is `None` a verifying [`UreqTransport`] is used.
    ///
    /// [`UreqTransport`]: super::UreqTransport
    pub fn new(
        url: impl Into<String>,
        max_retries: u32,
        extra: BTreeMap<String, serde_json::Value>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, HookBuildError> {
        let mut builder = Self::builder(url)
            .with_max_retries(max_retries)
            .with_extra_fields(extra);
        if let Some(transport) = transport {
            builder = builder.with_transport(transport);
        }
        builder.build()
    }

    /// Construct the hook from a resolved configuration and start its worker.
    ///
    /// # Errors
    ///
    /// Fails with [`HookBuildError::InvalidConfig`] for a zero capacity and
    /// with [`HookBuildError::Io`] if the worker thread cannot be spawned.
    pub fn with_config(config: HookConfig) -> Result<Self, HookBuildError> {
        if config.capacity == 0 {
            return Err(HookBuildError::InvalidConfig(
                "capacity must be greater than zero".into(),
            ));
        }
        let shared = Arc::new(SharedState::new());
        let (tx, handle) = spawn_worker(&config, Arc::clone(&shared))?;
        Ok(Self {
            identity: config.identity,
            min_level: config.min_level,
            tx: RwLock::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            shared,
            warner: RateLimitedWarner::new(config.warn_interval),
        })
    }

    /// Encode `record` and queue it for delivery.
    ///
    /// Blocks while the queue is full. Delivery errors are never returned.
    ///
    /// # Errors
    ///
    /// * [`HookError::Encode`] - a field failed to serialize; nothing was queued
    /// * [`HookError::Closed`] - the hook has been shut down
    pub fn fire<V: Serialize>(&self, record: &FemtoLogRecord<V>) -> Result<(), HookError> {
        let payload = encode_envelope(record, &self.identity)?;
        let Some(tx) = self.sender() else {
            self.warn_closed();
            return Err(HookError::Closed);
        };
        let payload = QueuedPayload {
            bytes: payload,
            ticket: self.shared.pending.admit(),
        };
        // A rejected command drops its ticket, releasing the pending count.
        if tx.send(WorkerCommand::Payload(payload)).is_err() {
            self.warn_closed();
            return Err(HookError::Closed);
        }
        Ok(())
    }

    /// Block until every payload queued so far has been attempted.
    ///
    /// There is no timeout: a worker stuck in a transport call that never
    /// returns keeps this waiting. Use [`flush_timeout`](Self::flush_timeout)
    /// to bound the wait.
    pub fn flush(&self) {
        self.shared.pending.wait_idle();
    }

    /// Like [`flush`](Self::flush) but gives up after `timeout`.
    ///
    /// Returns `true` if the queue drained in time.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.shared.pending.wait_idle_timeout(timeout)
    }

    /// Levels for which the logging framework should call [`fire`](Self::fire).
    pub fn levels(&self) -> Vec<FemtoLevel> {
        FemtoLevel::at_or_above(self.min_level)
    }

    pub fn is_enabled(&self, level: FemtoLevel) -> bool {
        level <= self.min_level
    }

    pub fn min_level(&self) -> FemtoLevel {
        self.min_level
    }

    pub fn host(&self) -> &str {
        &self.identity.host
    }

    pub fn facility(&self) -> &str {
        &self.identity.facility
    }

    pub fn extra(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.identity.extra
    }

    /// Payloads queued or in flight.
    pub fn pending(&self) -> usize {
        self.shared.pending.count()
    }

    pub fn worker_state(&self) -> WorkerState {
        self.shared.state.get()
    }

    /// Stop accepting records, deliver what is queued and join the worker.
    pub fn close(&self) {
        self.shutdown(ShutdownMode::Drain);
    }

    /// Stop accepting records and join the worker.
    ///
    /// Subsequent calls are no-ops.
    pub fn shutdown(&self, mode: ShutdownMode) {
        let Some(tx) = self.tx.write().take() else {
            return;
        };
        if mode == ShutdownMode::Abandon {
            self.shared.cancel.cancel();
        }
        // Producers blocked on a full queue hold their own senders, so an
        // explicit command is needed to stop the worker.
        let _ = tx.send(WorkerCommand::Shutdown);
        drop(tx);
        self.join_worker();
    }

    fn sender(&self) -> Option<Sender<WorkerCommand>> {
        self.tx.read().as_ref().cloned()
    }

    fn join_worker(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("FemtoGelfHook: worker thread panicked");
        }
    }

    fn warn_closed(&self) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("FemtoGelfHook dropped {count} records after shutdown");
        });
    }
}

impl Drop for FemtoGelfHook {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FemtoGelfHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FemtoGelfHook")
            .field("host", &self.identity.host)
            .field("facility", &self.identity.facility)
            .field("min_level", &self.min_level)
            .field("pending", &self.pending())
            .finish()
    }
}

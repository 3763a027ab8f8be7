//! In-memory transports for exercising the hook without a network.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::hook::{Transport, TransportError};

/// Records every payload it receives and answers with a fixed status.
pub struct RecordingTransport {
    status: u16,
    bodies: Mutex<Vec<Vec<u8>>>,
    arrived: Condvar,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::with_status(200)
    }
}

impl RecordingTransport {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            bodies: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
        }
    }

    /// Snapshot of all payloads in arrival order.
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().clone()
    }

    /// Payloads decoded as JSON.
    pub fn envelopes(&self) -> Vec<serde_json::Value> {
        self.bodies()
            .iter()
            .map(|body| serde_json::from_slice(body).expect("payload is JSON"))
            .collect()
    }

    /// Block until at least `count` payloads arrived or `timeout` elapsed.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut bodies = self.bodies.lock();
        while bodies.len() < count {
            if self.arrived.wait_until(&mut bodies, deadline).timed_out() {
                return bodies.len() >= count;
            }
        }
        true
    }
}

impl Transport for RecordingTransport {
    fn post(&self, _url: &str, body: &[u8]) -> Result<u16, TransportError> {
        self.bodies.lock().push(body.to_vec());
        self.arrived.notify_all();
        Ok(self.status)
    }
}

/// Fails every attempt with a transport error, remembering when each came.
#[derive(Default)]
pub struct FailingTransport {
    attempts: Mutex<Vec<Instant>>,
}

impl FailingTransport {
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

impl Transport for FailingTransport {
    fn post(&self, _url: &str, _body: &[u8]) -> Result<u16, TransportError> {
        self.attempts.lock().push(Instant::now());
        Err(TransportError::Send("connection refused".into()))
    }
}

/// Fails the first `failures` attempts, then succeeds.
pub struct FlakyTransport {
    remaining_failures: Mutex<u32>,
    inner: RecordingTransport,
}

impl FlakyTransport {
    pub fn new(failures: u32) -> Self {
        Self {
            remaining_failures: Mutex::new(failures),
            inner: RecordingTransport::default(),
        }
    }

    pub fn delivered(&self) -> Vec<Vec<u8>> {
        self.inner.bodies()
    }
}

impl Transport for FlakyTransport {
    fn post(&self, url: &str, body: &[u8]) -> Result<u16, TransportError> {
        let mut remaining = self.remaining_failures.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(TransportError::Send("temporarily unavailable".into()));
        }
        drop(remaining);
        self.inner.post(url, body)
    }
}

/// Holds every attempt until the test releases it.
///
/// Each call to `post` announces itself on [`GatedTransport::started`] and then
/// waits for one permit from [`GatedTransport::release`].
pub struct GatedTransport {
    permits: Receiver<()>,
    permit_tx: Sender<()>,
    started_tx: Sender<()>,
    started: Receiver<()>,
    inner: RecordingTransport,
}

impl Default for GatedTransport {
    fn default() -> Self {
        let (permit_tx, permits) = unbounded();
        let (started_tx, started) = unbounded();
        Self {
            permits,
            permit_tx,
            started_tx,
            started,
            inner: RecordingTransport::default(),
        }
    }
}

impl GatedTransport {
    /// Allow `count` blocked or future attempts to complete.
    pub fn release(&self, count: usize) {
        for _ in 0..count {
            let _ = self.permit_tx.send(());
        }
    }

    /// Wait until an attempt has entered `post`.
    pub fn wait_started(&self, timeout: Duration) -> bool {
        self.started.recv_timeout(timeout).is_ok()
    }

    pub fn delivered(&self) -> &RecordingTransport {
        &self.inner
    }
}

impl Transport for GatedTransport {
    fn post(&self, url: &str, body: &[u8]) -> Result<u16, TransportError> {
        let _ = self.started_tx.send(());
        if self.permits.recv().is_err() {
            return Err(TransportError::Send("gate closed".into()));
        }
        self.inner.post(url, body)
    }
}

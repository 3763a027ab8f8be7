//! Bounded retry with a fixed pause between attempts.
//!
//! Unlike exponential schemes there is no jitter or growth: every failed
//! attempt except the last is followed by the same interval. The pause can be
//! cut short by cancelling the worker's [`CancelToken`].

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use parking_lot::Mutex;

use super::config::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL};
use super::transport::{Transport, TransportError};

/// Attempt budget for a single payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts. Zero disables delivery entirely.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Result of running the policy for one payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// An attempt completed the HTTP exchange.
    Delivered { attempts: u32, status: u16 },
    /// Every attempt failed.
    Exhausted {
        attempts: u32,
        last_error: TransportError,
    },
    /// The policy allows zero attempts.
    NoAttempts,
    /// Shutdown cancelled the sequence before it finished.
    Cancelled {
        attempts: u32,
        last_error: Option<TransportError>,
    },
}

/// Cancellation signal shared between the hook and its worker.
///
/// Cancelling drops the sender half; the worker observes the disconnect both
/// when polling and while sleeping between attempts.
pub struct CancelToken {
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger: Mutex::new(Some(tx)),
            signal: rx,
        }
    }

    pub fn cancel(&self) {
        self.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration`. Returns `false` if cancelled first.
    pub fn sleep(&self, duration: Duration) -> bool {
        match self.signal.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
            // Nothing is ever sent on the channel.
            Ok(()) => true,
        }
    }
}

impl RetryPolicy {
    /// Deliver `payload` to `url`, retrying transport failures.
    pub fn deliver(
        &self,
        transport: &dyn Transport,
        url: &str,
        payload: &[u8],
        cancel: &CancelToken,
    ) -> DeliveryOutcome {
        if self.max_attempts == 0 {
            return DeliveryOutcome::NoAttempts;
        }
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return DeliveryOutcome::Cancelled {
                    attempts: attempt - 1,
                    last_error,
                };
            }
            match transport.post(url, payload) {
                Ok(status) => {
                    return DeliveryOutcome::Delivered {
                        attempts: attempt,
                        status,
                    };
                }
                Err(err) => {
                    log::debug!("delivery attempt {attempt}/{} failed: {err}", self.max_attempts);
                    last_error = Some(err);
                }
            }
            if attempt < self.max_attempts && !cancel.sleep(self.interval) {
                return DeliveryOutcome::Cancelled {
                    attempts: attempt,
                    last_error,
                };
            }
        }
        match last_error {
            Some(last_error) => DeliveryOutcome::Exhausted {
                attempts: self.max_attempts,
                last_error,
            },
            None => DeliveryOutcome::NoAttempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingTransport, FlakyTransport, RecordingTransport};
    use rstest::rstest;
    use std::time::Instant;

    fn policy(max_attempts: u32, interval_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[rstest]
    fn first_success_stops_the_sequence() {
        let transport = RecordingTransport::with_status(200);
        let outcome = policy(5, 1).deliver(&transport, "http://c/gelf", b"x", &CancelToken::new());
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1, status: 200 });
        assert_eq!(transport.bodies().len(), 1);
    }

    #[rstest]
    fn non_success_status_is_not_retried() {
        let transport = RecordingTransport::with_status(503);
        let outcome = policy(5, 1).deliver(&transport, "http://c/gelf", b"x", &CancelToken::new());
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1, status: 503 });
        assert_eq!(transport.bodies().len(), 1);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    fn failing_transport_is_attempted_exactly_max_times(#[case] max: u32) {
        let transport = FailingTransport::default();
        let interval = Duration::from_millis(20);
        let outcome = RetryPolicy { max_attempts: max, interval }.deliver(
            &transport,
            "http://c/gelf",
            b"x",
            &CancelToken::new(),
        );
        assert!(matches!(outcome, DeliveryOutcome::Exhausted { attempts, .. } if attempts == max));
        let times = transport.attempt_times();
        assert_eq!(times.len(), max as usize);
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[rstest]
    fn zero_attempts_never_touches_the_transport() {
        let transport = FailingTransport::default();
        let outcome = policy(0, 1).deliver(&transport, "http://c/gelf", b"x", &CancelToken::new());
        assert_eq!(outcome, DeliveryOutcome::NoAttempts);
        assert!(transport.attempt_times().is_empty());
    }

    #[rstest]
    fn recovers_after_transient_failures() {
        let transport = FlakyTransport::new(2);
        let outcome = policy(3, 1).deliver(&transport, "http://c/gelf", b"x", &CancelToken::new());
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3, status: 200 });
    }

    #[rstest]
    fn cancellation_interrupts_the_backoff_sleep() {
        let transport = FailingTransport::default();
        let cancel = CancelToken::new();
        let started = Instant::now();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(50));
                cancel.cancel();
            });
            let outcome = policy(3, 60_000).deliver(&transport, "http://c/gelf", b"x", &cancel);
            assert!(matches!(outcome, DeliveryOutcome::Cancelled { attempts: 1, .. }));
        });
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[rstest]
    fn cancelled_token_skips_all_attempts() {
        let transport = FailingTransport::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());
        let outcome = policy(3, 1).deliver(&transport, "http://c/gelf", b"x", &cancel);
        assert_eq!(
            outcome,
            DeliveryOutcome::Cancelled {
                attempts: 0,
                last_error: None
            }
        );
        assert!(transport.attempt_times().is_empty());
    }
}

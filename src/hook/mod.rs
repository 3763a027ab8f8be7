//! Asynchronous GELF-style log shipping.
//!
//! This module defines [`FemtoGelfHook`], which turns
//! [`FemtoLogRecord`](crate::log_record::FemtoLogRecord) values into JSON
//! envelopes on the caller's thread and hands them to a single worker thread
//! for delivery over HTTP. The queue between them is bounded; a full queue
//! blocks the caller.
//!
//! # Delivery Semantics
//!
//! - Payloads are attempted in the order they were fired.
//! - **Any HTTP response**, including 4xx and 5xx, ends the sequence as
//!   delivered.
//! - **Transport errors** are retried up to the configured attempt count with
//!   a fixed pause between attempts. No pause follows the final attempt.
//! - Payloads that are never delivered are reported through the rate-limited
//!   `log` warnings and the optional failure callback.
//!
//! [`FemtoGelfHook::flush`] waits for every payload fired so far to finish its
//! sequence; [`FemtoGelfHook::close`] additionally stops the worker.

mod builder;
mod config;
mod envelope;
mod error;
mod handle;
mod pending;
mod retry;
mod transport;
mod worker;


pub use builder::GelfHookBuilder;
pub use config::{
    AuthConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_INTERVAL, ENVELOPE_VERSION, FailureCallback,
    HookConfig, HookIdentity, TransportConfig,
};
pub use envelope::{GelfEnvelope, encode_envelope};
pub use error::{HookBuildError, HookError};
pub use handle::{FemtoGelfHook, ShutdownMode};
pub use retry::{CancelToken, DeliveryOutcome, RetryPolicy};
pub use transport::{Transport, TransportError, UreqTransport};
pub use worker::{DeliveryFailure, FailureReason, WORKER_THREAD_NAME, WorkerState};
#[cfg(feature = "log-compat")]
pub(crate) use worker::on_worker_thread;

//! Asynchronous log shipping to GELF-style HTTP collectors.
//!
//! Records are encoded on the calling thread and queued for a single
//! background worker that posts them with bounded, fixed-interval retry.
//! See [`FemtoGelfHook`] for the entry point and [`log_compat`] for the
//! `log` crate bridge.

pub mod file_config;
pub mod hook;
pub mod level;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod log_record;
mod rate_limited_warner;

#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use file_config::{ConfigFileError, load_builder};
pub use hook::{
    DeliveryFailure, FailureReason, FemtoGelfHook, GelfHookBuilder, HookBuildError, HookError,
    ShutdownMode, Transport, TransportError, UreqTransport, WorkerState,
};
pub use level::{FemtoLevel, ParseLevelError};
#[cfg(feature = "log-compat")]
pub use log_compat::{FemtoGelfLogger, install_global_logger};
pub use log_record::{FemtoLogRecord, RecordMetadata};
pub use rate_limited_warner::DEFAULT_WARN_INTERVAL;

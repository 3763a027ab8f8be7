use std::io;

use thiserror::Error;

/// Errors returned synchronously from [`FemtoGelfHook::fire`](super::FemtoGelfHook::fire).
///
/// Delivery failures are never reported here; they happen later on the
/// worker thread.
#[derive(Debug, Error)]
pub enum HookError {
    /// The record could not be serialized; it was not queued.
    #[error("failed to encode log envelope: {0}")]
    Encode(#[from] serde_json::Error),
    /// The hook has been shut down.
    #[error("hook is closed")]
    Closed,
}

/// Errors that may occur while building a hook.
#[derive(Debug, Error)]
pub enum HookBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid hook configuration: {0}")]
    InvalidConfig(String),
    /// The local host name could not be resolved.
    #[error("failed to resolve host name: {0}")]
    Hostname(#[source] io::Error),
    /// The TLS backend for the default transport failed to initialise.
    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
    /// The worker thread could not be spawned.
    #[error(transparent)]
    Io(#[from] io::Error),
}

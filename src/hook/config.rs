//! Configuration structures consumed by the hook lifecycle.
//!
//! `GelfHookBuilder` validates user input and resolves the hook identity
//! before handing a [`HookConfig`] to
//! [`FemtoGelfHook`](super::FemtoGelfHook) for runtime use.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::level::FemtoLevel;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

use super::retry::RetryPolicy;
use super::transport::Transport;
use super::worker::DeliveryFailure;

/// Default bounded queue capacity used by the hook.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;
/// Default number of delivery attempts per payload.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Fixed pause between delivery attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);
/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a single delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Schema version written into every envelope.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Callback invoked on the worker thread when a payload is permanently lost.
pub type FailureCallback = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

/// Authentication configuration for HTTP requests.
#[derive(Clone, Debug, Default)]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic authentication with username and password.
    Basic { username: String, password: String },
    /// Bearer token authentication.
    Bearer { token: String },
}

/// Settings for the default ureq-based transport.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Upper bound on a single delivery attempt.
    pub request_timeout: Duration,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    pub insecure_skip_verify: bool,
    /// Additional HTTP headers to include in requests.
    pub headers: HashMap<String, String>,
    /// Authentication configuration.
    pub auth: AuthConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            insecure_skip_verify: false,
            headers: HashMap::new(),
            auth: AuthConfig::default(),
        }
    }
}

/// Fields stamped onto every envelope, fixed at construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HookIdentity {
    /// Name of the machine emitting records.
    pub host: String,
    /// Label of the emitting program.
    pub facility: String,
    /// Extra fields attached to every envelope.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Immutable configuration for a [`FemtoGelfHook`](super::FemtoGelfHook).
#[derive(Clone)]
pub struct HookConfig {
    /// Collector URL receiving POSTed envelopes.
    pub url: String,
    /// Host, facility and extra fields.
    pub identity: HookIdentity,
    /// Bounded queue capacity.
    pub capacity: usize,
    /// Attempt count and pause between attempts.
    pub retry: RetryPolicy,
    /// Least severe level reported by `levels()`.
    pub min_level: FemtoLevel,
    /// Transport used for every delivery attempt.
    pub transport: Arc<dyn Transport>,
    /// Observer for permanently lost payloads.
    pub on_failure: Option<FailureCallback>,
    /// Interval between rate-limited warnings.
    pub warn_interval: Duration,
}

impl HookConfig {
    /// Configuration with library defaults for everything except the URL,
    /// identity and transport.
    pub fn new(
        url: impl Into<String>,
        identity: HookIdentity,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            url: url.into(),
            identity,
            capacity: DEFAULT_QUEUE_CAPACITY,
            retry: RetryPolicy::default(),
            min_level: FemtoLevel::default(),
            transport,
            on_failure: None,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("url", &self.url)
            .field("identity", &self.identity)
            .field("capacity", &self.capacity)
            .field("retry", &self.retry)
            .field("min_level", &self.min_level)
            .field("on_failure", &self.on_failure.is_some())
            .field("warn_interval", &self.warn_interval)
            .finish_non_exhaustive()
    }
}

//! Builder for [`FemtoGelfHook`](super::FemtoGelfHook).
//!
//! Exposes the collector URL, retry budget, queue capacity, extra fields and
//! the knobs of the default transport. Host and facility are resolved from
//! the running process unless overridden.

use std::{
    collections::{BTreeMap, HashMap},
    ffi::OsStr,
    path::Path,
    sync::Arc,
    time::Duration,
};

use crate::level::FemtoLevel;

use super::{
    FemtoGelfHook,
    config::{
        AuthConfig, DEFAULT_QUEUE_CAPACITY, FailureCallback, HookConfig, HookIdentity,
        TransportConfig,
    },
    error::HookBuildError,
    retry::RetryPolicy,
    transport::{Transport, UreqTransport},
    worker::DeliveryFailure,
};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(HookBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`FemtoGelfHook`] instances.
#[derive(Clone, Default)]
pub struct GelfHookBuilder {
    url: String,
    max_retries: Option<u32>,
    retry_interval: Option<Duration>,
    capacity: Option<usize>,
    min_level: Option<FemtoLevel>,
    extra: BTreeMap<String, serde_json::Value>,
    host: Option<String>,
    facility: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    on_failure: Option<FailureCallback>,
    warn_interval: Option<Duration>,
}

impl GelfHookBuilder {
    /// Create a builder targeting `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    option_setter!(
        #[doc = "Set the number of delivery attempts per payload. Zero disables delivery."]
        with_max_retries,
        max_retries,
        u32
    );
    option_setter!(
        #[doc = "Set the fixed pause between delivery attempts."]
        with_retry_interval,
        retry_interval,
        Duration
    );
    option_setter!(
        #[doc = "Set the bounded queue capacity."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(
        #[doc = "Set the least severe level the hook reports in `levels()`."]
        with_min_level,
        min_level,
        FemtoLevel
    );
    option_setter!(
        #[doc = "Set the interval between rate-limited warnings."]
        with_warn_interval,
        warn_interval,
        Duration
    );

    /// Attach a field to every envelope.
    pub fn with_extra(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Merge a map of fields attached to every envelope.
    pub fn with_extra_fields(mut self, fields: BTreeMap<String, serde_json::Value>) -> Self {
        self.extra.extend(fields);
        self
    }

    /// Override the host name instead of resolving it.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Override the facility instead of deriving it from the program name.
    pub fn with_facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    /// Use a caller-supplied transport. Transport settings on this builder
    /// are then ignored.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the connection timeout of the default transport.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport_config.connect_timeout = timeout;
        self
    }

    /// Bound each delivery attempt of the default transport.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.transport_config.request_timeout = timeout;
        self
    }

    /// Disable TLS certificate and host name verification.
    ///
    /// Verification is on by default; only enable this for collectors with
    /// self-signed certificates you trust.
    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.transport_config.insecure_skip_verify = skip;
        self
    }

    /// Add a single custom HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport_config.headers.insert(key.into(), value.into());
        self
    }

    /// Replace all custom HTTP headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.transport_config.headers = headers;
        self
    }

    /// Configure HTTP Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.transport_config.auth = AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Configure Bearer token authentication.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.transport_config.auth = AuthConfig::Bearer {
            token: token.into(),
        };
        self
    }

    /// Observe payloads that will never be delivered.
    ///
    /// The callback runs on the worker thread and delays the next delivery
    /// while it executes.
    pub fn with_failure_callback(
        mut self,
        callback: impl Fn(&DeliveryFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    fn validate(&self) -> Result<(), HookBuildError> {
        self.validate_url()?;
        self.validate_capacity()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_url(&self) -> Result<(), HookBuildError> {
        if self.url.trim().is_empty() {
            return Err(HookBuildError::InvalidConfig(
                "collector URL must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn validate_capacity(&self) -> Result<(), HookBuildError> {
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), HookBuildError> {
        if self.transport.is_none() {
            ensure_positive!(
                self.transport_config.connect_timeout.as_millis(),
                "connect_timeout"
            )?;
            ensure_positive!(
                self.transport_config.request_timeout.as_millis(),
                "request_timeout"
            )?;
        }
        Ok(())
    }

    fn identity(&self) -> Result<HookIdentity, HookBuildError> {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => resolve_hostname()?,
        };
        let facility = self.facility.clone().unwrap_or_else(resolve_facility);
        Ok(HookIdentity {
            host,
            facility,
            extra: self.extra.clone(),
        })
    }

    fn resolve_transport(&self) -> Result<Arc<dyn Transport>, HookBuildError> {
        match &self.transport {
            Some(transport) => Ok(Arc::clone(transport)),
            None => Ok(Arc::new(UreqTransport::new(&self.transport_config)?)),
        }
    }

    /// Validate the builder and resolve it into a [`HookConfig`].
    pub fn build_config(&self) -> Result<HookConfig, HookBuildError> {
        self.validate()?;
        let identity = self.identity()?;
        let transport = self.resolve_transport()?;
        let mut config = HookConfig::new(self.url.clone(), identity, transport);
        config.capacity = self.capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        let defaults = RetryPolicy::default();
        config.retry = RetryPolicy {
            max_attempts: self.max_retries.unwrap_or(defaults.max_attempts),
            interval: self.retry_interval.unwrap_or(defaults.interval),
        };
        if let Some(level) = self.min_level {
            config.min_level = level;
        }
        if let Some(interval) = self.warn_interval {
            config.warn_interval = interval;
        }
        config.on_failure = self.on_failure.clone();
        Ok(config)
    }

    /// Build the hook and start its worker.
    pub fn build(&self) -> Result<FemtoGelfHook, HookBuildError> {
        FemtoGelfHook::with_config(self.build_config()?)
    }
}

impl std::fmt::Debug for GelfHookBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GelfHookBuilder")
            .field("url", &self.url)
            .field("max_retries", &self.max_retries)
            .field("retry_interval", &self.retry_interval)
            .field("capacity", &self.capacity)
            .field("min_level", &self.min_level)
            .field("extra", &self.extra)
            .field("host", &self.host)
            .field("facility", &self.facility)
            .field("custom_transport", &self.transport.is_some())
            .field("transport_config", &self.transport_config)
            .finish_non_exhaustive()
    }
}

fn resolve_hostname() -> Result<String, HookBuildError> {
    let host = hostname::get().map_err(HookBuildError::Hostname)?;
    Ok(host.to_string_lossy().into_owned())
}

/// Base name of the program as invoked, falling back to the executable path.
pub(crate) fn resolve_facility() -> String {
    if let Some(name) = std::env::args_os().next().as_deref().and_then(base_name) {
        return name;
    }
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(|path| base_name(path.as_os_str()))
        .unwrap_or_default()
}

fn base_name(invocation: &OsStr) -> Option<String> {
    Path::new(invocation)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use rstest::rstest;

    fn recording() -> Arc<dyn Transport> {
        Arc::new(RecordingTransport::default())
    }

    #[rstest]
    fn empty_url_is_rejected() {
        let err = GelfHookBuilder::new("  ")
            .with_transport(recording())
            .build_config()
            .expect_err("empty url");
        assert!(matches!(err, HookBuildError::InvalidConfig(msg) if msg.contains("URL")));
    }

    #[rstest]
    fn zero_capacity_is_rejected() {
        let err = GelfHookBuilder::new("http://collector/gelf")
            .with_transport(recording())
            .with_capacity(0)
            .build_config()
            .expect_err("zero capacity");
        assert!(matches!(err, HookBuildError::InvalidConfig(msg) if msg.contains("capacity")));
    }

    #[rstest]
    fn zero_request_timeout_is_rejected_for_default_transport() {
        let err = GelfHookBuilder::new("http://collector/gelf")
            .with_host("h")
            .with_request_timeout(Duration::ZERO)
            .build_config()
            .expect_err("zero timeout");
        assert!(matches!(
            err,
            HookBuildError::InvalidConfig(msg) if msg.contains("request_timeout")
        ));
    }

    #[rstest]
    fn defaults_are_applied() {
        let config = GelfHookBuilder::new("http://collector/gelf")
            .with_transport(recording())
            .build_config()
            .expect("config");
        assert_eq!(config.capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.min_level, FemtoLevel::Debug);
        assert_eq!(config.min_level, FemtoLevel::default());
        assert!(config.on_failure.is_none());
        assert!(!config.identity.host.is_empty());
    }

    #[rstest]
    fn overrides_reach_the_config() {
        let config = GelfHookBuilder::new("http://collector/gelf")
            .with_transport(recording())
            .with_max_retries(0)
            .with_retry_interval(Duration::from_millis(5))
            .with_capacity(16)
            .with_min_level(FemtoLevel::Warn)
            .with_host("web-1")
            .with_facility("billing")
            .with_extra("env", "prod")
            .with_extra("shard", 7)
            .with_failure_callback(|_| {})
            .build_config()
            .expect("config");
        assert_eq!(config.capacity, 16);
        assert_eq!(config.retry.max_attempts, 0);
        assert_eq!(config.retry.interval, Duration::from_millis(5));
        assert_eq!(config.min_level, FemtoLevel::Warn);
        assert_eq!(config.identity.host, "web-1");
        assert_eq!(config.identity.facility, "billing");
        assert_eq!(config.identity.extra["env"], "prod");
        assert_eq!(config.identity.extra["shard"], 7);
        assert!(config.on_failure.is_some());
    }

    #[rstest]
    #[case("/usr/local/bin/billing-api", Some("billing-api"))]
    #[case("billing-api", Some("billing-api"))]
    #[case("./target/debug/svc", Some("svc"))]
    #[case("", None)]
    fn facility_is_the_program_base_name(#[case] invocation: &str, #[case] expected: Option<&str>) {
        assert_eq!(base_name(OsStr::new(invocation)).as_deref(), expected);
    }

    #[rstest]
    fn facility_resolves_for_the_test_binary() {
        assert!(!resolve_facility().is_empty());
    }
}

//! HTTP transport used by the delivery worker.
//!
//! The worker only needs one capability: POST a byte payload to a URL and
//! learn whether the HTTP exchange completed. [`Transport`] captures that, and
//! [`UreqTransport`] is the default implementation built on a `ureq::Agent`.

use std::io;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use native_tls::TlsConnector;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use super::config::{AuthConfig, TransportConfig};

/// Failure of a single delivery attempt.
///
/// Both variants are retried by the worker. Non-2xx responses are not errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be constructed (bad URL, unsupported scheme).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The request was built but the exchange failed at the transport level.
    #[error("transport failure: {0}")]
    Send(String),
}

/// Sends a payload to a collector.
///
/// Implementations are shared between the hook and its worker thread, so they
/// must be `Send + Sync`.
pub trait Transport: Send + Sync {
    /// POST `body` to `url`, returning the HTTP status on any completed
    /// exchange.
    fn post(&self, url: &str, body: &[u8]) -> Result<u16, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, url: &str, body: &[u8]) -> Result<u16, TransportError> {
        (**self).post(url, body)
    }
}

/// Default transport: a pooled `ureq` agent with explicit timeouts.
pub struct UreqTransport {
    agent: Agent,
    headers: Vec<(String, String)>,
    authorization: Option<String>,
}

impl UreqTransport {
    /// Build an agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns the TLS connector error if the native TLS backend cannot be
    /// initialised.
    pub fn new(config: &TransportConfig) -> Result<Self, native_tls::Error> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .danger_accept_invalid_hostnames(config.insecure_skip_verify)
            .build()?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .tls_connector(Arc::new(connector))
            .build();
        let mut headers: Vec<(String, String)> = config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.sort();
        Ok(Self {
            agent,
            headers,
            authorization: authorization_header(&config.auth),
        })
    }

    fn request(&self, url: &str) -> ureq::Request {
        let mut req = self
            .agent
            .post(url)
            .set("Content-Type", "application/json");
        if let Some(auth) = &self.authorization {
            req = req.set("Authorization", auth);
        }
        for (key, value) in &self.headers {
            req = req.set(key, value);
        }
        req
    }
}

impl Transport for UreqTransport {
    fn post(&self, url: &str, body: &[u8]) -> Result<u16, TransportError> {
        match self.request(url).send_bytes(body) {
            Ok(response) => Ok(drain_response(response)),
            Err(err) => match err {
                ureq::Error::Status(code, response) => {
                    drain_response(response);
                    Ok(code)
                }
                ureq::Error::Transport(transport) => Err(classify_transport(&transport)),
            },
        }
    }
}

fn classify_transport(err: &ureq::Transport) -> TransportError {
    match err.kind() {
        ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
            TransportError::InvalidRequest(err.to_string())
        }
        _ => TransportError::Send(err.to_string()),
    }
}

/// Read the body to completion so the connection returns to the pool.
fn drain_response(response: ureq::Response) -> u16 {
    let status = response.status();
    let _ = io::copy(&mut response.into_reader(), &mut io::sink());
    status
}

fn authorization_header(auth: &AuthConfig) -> Option<String> {
    match auth {
        AuthConfig::None => None,
        AuthConfig::Basic { username, password } => {
            let credentials = format!("{username}:{password}");
            Some(format!("Basic {}", BASE64_STANDARD.encode(credentials)))
        }
        AuthConfig::Bearer { token } => Some(format!("Bearer {token}")),
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("headers", &self.headers.len())
            .field("authorization", &self.authorization.is_some())
            .finish()
    }
}

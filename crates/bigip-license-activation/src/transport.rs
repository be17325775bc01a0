//! HTTP transport to the activation service.
//!
//! `ActivationTransport` is the seam the client posts through.
//! `HttpTransport` is the production implementation on a blocking `ureq` agent.
//! `ScriptedTransport` is the test double that records envelopes and replays responses.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::ActivationConfig;

pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Upper bound on a response body; licenses and EULAs are far smaller
const MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("reading response failed: {0}")]
    Read(String),
}

/// Posts one envelope and returns the raw response body
pub trait ActivationTransport {
    fn post(&self, url: &str, envelope: &str) -> Result<Vec<u8>, TransportError>;
}

impl<T: ActivationTransport + ?Sized> ActivationTransport for &T {
    fn post(&self, url: &str, envelope: &str) -> Result<Vec<u8>, TransportError> {
        (**self).post(url, envelope)
    }
}

pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(config: &ActivationConfig) -> Result<Self, TransportError> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .danger_accept_invalid_hostnames(config.accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        let agent = ureq::AgentBuilder::new()
            .tls_connector(Arc::new(connector))
            .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
            .timeout_read(Duration::from_millis(config.request_timeout_ms))
            .timeout_write(Duration::from_millis(config.request_timeout_ms))
            .build();

        Ok(Self { agent })
    }
}

impl ActivationTransport for HttpTransport {
    fn post(&self, url: &str, envelope: &str) -> Result<Vec<u8>, TransportError> {
        let request = self
            .agent
            .post(url)
            .set("SOAPAction", "\"\"")
            .set("Content-Type", SOAP_CONTENT_TYPE);

        let response = match request.send_string(envelope) {
            Ok(response) => response,
            // SOAP faults come back as 500 with a readable body
            Err(ureq::Error::Status(status, response)) => {
                debug!(status, "activation service answered with error status");
                response
            }
            Err(ureq::Error::Transport(err)) => return Err(TransportError::Request(err.to_string())),
        };

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| TransportError::Read(e.to_string()))?;
        Ok(body)
    }
}

/// Test-double transport with queued responses.
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<Vec<u8>, TransportError>>>,
    fallback: Option<Result<Vec<u8>, TransportError>>,
    requests: RefCell<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn with_responses(responses: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        ScriptedTransport {
            responses: RefCell::new(responses.into()),
            fallback: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Answers every request the same way
    pub fn always(response: Result<Vec<u8>, TransportError>) -> Self {
        ScriptedTransport {
            responses: RefCell::new(VecDeque::new()),
            fallback: Some(response),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Envelopes posted so far, in order
    pub fn envelopes(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|(_, body)| body.clone()).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ActivationTransport for ScriptedTransport {
    fn post(&self, url: &str, envelope: &str) -> Result<Vec<u8>, TransportError> {
        self.requests
            .borrow_mut()
            .push((url.to_string(), envelope.to_string()));
        match self.responses.borrow_mut().pop_front() {
            Some(response) => response,
            None => self.fallback.clone().unwrap_or_else(|| {
                Err(TransportError::Request("no scripted response left".to_string()))
            }),
        }
    }
}

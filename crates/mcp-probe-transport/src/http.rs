//! HTTP POST transport.
//!
//! Unlike the stream transports there is no persistent frame stream: each
//! logical call is one `POST {base}/mcp` exchange whose response body is
//! the JSON-RPC reply. Notifications are posted the same way with the reply
//! body ignored. No read buffering exists because every exchange is
//! self-contained.
//!
//! `send`/`recv` keep the [`Transport`] contract: a notification is posted
//! immediately, a request is held until `recv` supplies the exchange
//! deadline.

use std::time::{Duration, Instant};

use mcp_probe_protocol::JsonRpcRequest;
use serde_json::Value;

use crate::{Frame, Transport, TransportError};

/// Timeout for the auxiliary GET endpoints (health, server info).
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP transport for an MCP server exposing `POST {base}/mcp`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    rpc_url: String,
    /// Used for notification posts, which carry no caller deadline.
    default_timeout: Duration,
    /// Request sent but not yet exchanged.
    outgoing: Option<JsonRpcRequest>,
}

impl HttpTransport {
    /// Creates a transport for the given base URL (e.g.
    /// `http://localhost:9090`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Creates a transport with an explicit default timeout for
    /// notification posts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(base_url: &str, default_timeout: Duration) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self {
            rpc_url: format!("{base_url}/mcp"),
            client,
            base_url,
            default_timeout,
            outgoing: None,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks the server's health endpoint (`GET {base}/health`).
    pub fn health(&self) -> Result<Value, TransportError> {
        let value = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(ENDPOINT_TIMEOUT)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(value)
    }

    /// Fetches the server-info object from the root endpoint (`GET {base}/`).
    pub fn server_info(&self) -> Result<Value, TransportError> {
        let value = self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(ENDPOINT_TIMEOUT)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(value)
    }

    /// Posts one JSON-RPC body and returns the raw reply text.
    fn exchange(
        &self,
        message: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.rpc_url)
            .json(message)
            .timeout(timeout)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout {
                        elapsed: start.elapsed(),
                    }
                } else {
                    TransportError::Http(err)
                }
            })?;
        Ok(response.error_for_status()?.text()?)
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, message: &JsonRpcRequest) -> Result<(), TransportError> {
        if message.is_notification() {
            // Fire and forget; the reply body carries nothing to correlate.
            let _ = self.exchange(message, self.default_timeout)?;
            Ok(())
        } else {
            self.outgoing = Some(message.clone());
            Ok(())
        }
    }

    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError> {
        let outgoing = self.outgoing.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::other("no HTTP exchange pending"))
        })?;

        let body = self.exchange(&outgoing, timeout)?;
        match serde_json::from_str(&body) {
            Ok(message) => Ok(Frame::Message(message)),
            Err(err) => Ok(Frame::Malformed {
                line: body,
                detail: err.to_string(),
            }),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.outgoing = None;
        Ok(())
    }
}

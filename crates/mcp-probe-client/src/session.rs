//! Request/response correlation over a transport.

use std::time::{Duration, Instant};

use mcp_probe_protocol::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId};
use mcp_probe_transport::{Frame, Transport, TransportError};
use serde_json::Value;

/// How much of a malformed line is kept in the error message.
const MALFORMED_PREVIEW_LEN: usize = 120;

/// A synchronous JSON-RPC session over one exclusively owned transport.
///
/// Exactly one request may be in flight at a time; the next response frame
/// read after a send is taken to be that request's reply, and a response
/// carrying any other id is a [`SessionError::Protocol`].
pub struct RpcSession<T: Transport> {
    transport: T,
    /// Next request id; starts at 1, never reused.
    next_id: i64,
    default_timeout: Duration,
}

impl<T: Transport> RpcSession<T> {
    /// Creates a session with a 30 second default call timeout.
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, Duration::from_secs(30))
    }

    /// Creates a session with an explicit default call timeout.
    pub fn with_timeout(transport: T, default_timeout: Duration) -> Self {
        Self {
            transport,
            next_id: 1,
            default_timeout,
        }
    }

    /// Returns the default per-call timeout.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Sends a request and blocks until its response arrives.
    ///
    /// A response carrying an `error` object is returned as data, not an
    /// `Err`; the server rejecting a method is not a transport fault.
    ///
    /// # Errors
    ///
    /// See [`SessionError`]. None of the failure modes corrupt the session;
    /// a subsequent call on the same session may succeed.
    pub fn call(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, SessionError> {
        self.call_with_timeout(method, params, self.default_timeout)
    }

    /// Sends a request and blocks until its response arrives or `timeout`
    /// elapses.
    pub fn call_with_timeout(
        &mut self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, SessionError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(method, params, id);
        log::debug!("-> {method} (id {id})");
        self.transport.send(&request)?;

        let start = Instant::now();
        let deadline = start + timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout {
                    method: method.to_owned(),
                    elapsed: start.elapsed(),
                });
            }

            let frame = match self.transport.recv(deadline - now) {
                Ok(frame) => frame,
                Err(TransportError::Timeout { .. }) => {
                    return Err(SessionError::Timeout {
                        method: method.to_owned(),
                        elapsed: start.elapsed(),
                    });
                }
                Err(err) => return Err(SessionError::Transport(err)),
            };

            match frame {
                Frame::Message(JsonRpcMessage::Response(response)) => {
                    if response.payload().is_none() {
                        return Err(SessionError::Protocol {
                            detail: format!(
                                "response {} carries neither or both of result and error",
                                response
                                    .id
                                    .as_ref()
                                    .map_or_else(|| "<no id>".to_owned(), ToString::to_string)
                            ),
                        });
                    }
                    if response.id != Some(RequestId::Number(id)) {
                        // Non-pipelined protocol: a foreign id means the
                        // peer and client disagree about what is in flight
                        // (e.g. a stale reply from a timed-out call).
                        return Err(SessionError::Protocol {
                            detail: format!(
                                "expected response id {id}, got {}",
                                response
                                    .id
                                    .as_ref()
                                    .map_or_else(|| "<no id>".to_owned(), ToString::to_string)
                            ),
                        });
                    }
                    log::debug!("<- {method} (id {id})");
                    return Ok(response);
                }
                Frame::Message(JsonRpcMessage::Request(incoming)) => {
                    // Server-initiated traffic is not the reply we are
                    // waiting for; keep waiting within the deadline.
                    log::debug!(
                        "ignoring server-initiated {} while awaiting id {id}",
                        incoming.method
                    );
                }
                Frame::Malformed { line, detail } => {
                    log::warn!("malformed frame from server: {detail}");
                    let mut preview = line;
                    if preview.len() > MALFORMED_PREVIEW_LEN {
                        preview.truncate(MALFORMED_PREVIEW_LEN);
                        preview.push('…');
                    }
                    return Err(SessionError::Malformed {
                        detail: format!("{detail}: {preview}"),
                    });
                }
            }
        }
    }

    /// Sends a notification.
    ///
    /// Returns as soon as the write completes; no reply is awaited, and the
    /// absence of one is never an error.
    pub fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        let notification = JsonRpcRequest::notification(method, params);
        log::debug!("-> {method} (notification)");
        self.transport.send(&notification)?;
        Ok(())
    }

    /// Returns a reference to the owned transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) -> Result<(), SessionError> {
        self.transport.close()?;
        Ok(())
    }
}

/// Session error taxonomy.
///
/// Application-level errors (a well-formed response with an `error` object)
/// are deliberately absent: those are returned as data from
/// [`RpcSession::call`].
#[derive(Debug)]
pub enum SessionError {
    /// Failure in the underlying channel.
    Transport(TransportError),
    /// The per-call deadline elapsed with no matching response.
    Timeout {
        /// Method of the abandoned call.
        method: String,
        /// How long the call waited.
        elapsed: Duration,
    },
    /// A received line was not valid JSON-RPC.
    Malformed {
        /// Parse failure plus a bounded preview of the offending line.
        detail: String,
    },
    /// A well-formed response that cannot belong to the outstanding
    /// request.
    Protocol {
        /// What was wrong with it.
        detail: String,
    },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Transport(err) => write!(f, "{err}"),
            SessionError::Timeout { method, elapsed } => {
                write!(
                    f,
                    "call to {method} timed out after {}ms",
                    elapsed.as_millis()
                )
            }
            SessionError::Malformed { detail } => write!(f, "malformed frame: {detail}"),
            SessionError::Protocol { detail } => write!(f, "protocol error: {detail}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Transport(err)
    }
}

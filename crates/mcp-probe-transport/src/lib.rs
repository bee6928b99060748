//! Transport layer for the mcp-probe client suite.
//!
//! Three transports carry JSON-RPC frames to an MCP server:
//!
//! - [`TcpTransport`]: a raw stream socket, NDJSON framing
//! - [`PipeTransport`]: a spawned server subprocess over stdin/stdout,
//!   NDJSON framing
//! - [`HttpTransport`]: one HTTP POST per logical call, no frame stream
//!
//! All three implement [`Transport`], so the session and scenario layers
//! above are transport-agnostic. Deadlines are explicit: `recv` takes the
//! caller's remaining timeout budget and returns [`TransportError::Timeout`]
//! when it elapses, leaving the connection open for reuse.

#![forbid(unsafe_code)]

mod codec;
mod http;
mod pipe;
mod tcp;

use std::time::Duration;

use mcp_probe_protocol::JsonRpcRequest;

pub use codec::{CodecError, Frame, FrameCodec};
pub use http::HttpTransport;
pub use pipe::PipeTransport;
pub use tcp::TcpTransport;

/// Read chunk size for stream transports.
pub(crate) const READ_CHUNK_SIZE: usize = 8192;

/// A byte- or exchange-oriented channel to an MCP server.
pub trait Transport {
    /// Sends one request or notification.
    ///
    /// Blocking, full-buffer write. For the HTTP transport a notification
    /// is posted immediately while a request is held until [`Transport::recv`]
    /// supplies the exchange deadline.
    fn send(&mut self, message: &JsonRpcRequest) -> Result<(), TransportError>;

    /// Receives the next frame, waiting at most `timeout`.
    ///
    /// Returns [`TransportError::Timeout`] if no complete frame arrives in
    /// time and [`TransportError::Closed`] if the peer closed the channel.
    /// A frame that fails to parse comes back as [`Frame::Malformed`], not
    /// an error; later frames remain decodable.
    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError>;

    /// Releases the underlying resource.
    ///
    /// Safe to call multiple times; the first call does the work.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Transport error taxonomy.
#[derive(Debug)]
pub enum TransportError {
    /// Connecting or spawning the peer failed.
    Connect {
        /// What we tried to reach.
        target: String,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// I/O failure on an established channel.
    Io(std::io::Error),
    /// The peer closed the channel.
    Closed,
    /// The deadline elapsed with no complete frame.
    Timeout {
        /// How long we waited.
        elapsed: Duration,
    },
    /// HTTP exchange failure.
    Http(reqwest::Error),
    /// Framing-level failure (oversized line, encode failure).
    Codec(CodecError),
}

impl TransportError {
    /// Returns true for connect/spawn failures, used by drivers to print
    /// is-the-server-running guidance.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Connect { .. } => true,
            TransportError::Http(err) => err.is_connect(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connect { target, source } => {
                write!(f, "failed to connect to {target}: {source}")
            }
            TransportError::Io(err) => write!(f, "I/O error: {err}"),
            TransportError::Closed => write!(f, "connection closed by peer"),
            TransportError::Timeout { elapsed } => {
                write!(f, "timed out after {}ms", elapsed.as_millis())
            }
            TransportError::Http(err) => write!(f, "HTTP error: {err}"),
            TransportError::Codec(err) => write!(f, "codec error: {err}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Connect { source, .. } => Some(source),
            TransportError::Io(err) => Some(err),
            TransportError::Http(err) => Some(err),
            TransportError::Codec(err) => Some(err),
            TransportError::Closed | TransportError::Timeout { .. } => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err)
    }
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        TransportError::Codec(err)
    }
}

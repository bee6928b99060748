//! TCP stream transport.
//!
//! Connects a stream socket to the server's TCP listener and carries NDJSON
//! frames over it. Reads pull raw bytes in 8 KiB chunks and feed the codec
//! until a complete frame is available or the caller's deadline elapses;
//! the socket's read timeout is re-armed with the remaining budget on every
//! iteration.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

use mcp_probe_protocol::JsonRpcRequest;

use crate::{Frame, FrameCodec, READ_CHUNK_SIZE, Transport, TransportError};

/// TCP transport for an MCP server listening on host:port.
#[derive(Debug)]
pub struct TcpTransport {
    /// `None` once closed.
    stream: Option<TcpStream>,
    codec: FrameCodec,
    /// Frames decoded but not yet delivered (a single read may complete
    /// several lines).
    pending: VecDeque<Frame>,
    peer: String,
}

impl TcpTransport {
    /// Connects to the server.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the peer is unreachable or
    /// refuses the connection.
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let peer = format!("{host}:{port}");
        let stream =
            TcpStream::connect(peer.as_str()).map_err(|source| TransportError::Connect {
                target: peer.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        log::debug!("connected to {peer}");
        Ok(Self {
            stream: Some(stream),
            codec: FrameCodec::new(),
            pending: VecDeque::new(),
            peer,
        })
    }

    /// Returns the peer address this transport was connected to.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, message: &JsonRpcRequest) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let bytes = self.codec.encode(message)?;
        stream.write_all(&bytes)?;
        stream.flush()?;
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(frame);
        }
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;

        let start = Instant::now();
        let deadline = start + timeout;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::Timeout {
                    elapsed: start.elapsed(),
                });
            }
            stream.set_read_timeout(Some(deadline - now))?;

            match stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    self.pending.extend(self.codec.feed(&chunk[..n])?);
                    if let Some(frame) = self.pending.pop_front() {
                        return Ok(frame);
                    }
                }
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout {
                        elapsed: start.elapsed(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(stream) = self.stream.take() {
            log::debug!("closing connection to {}", self.peer);
            // NotConnected here just means the peer already went away.
            if let Err(err) = stream.shutdown(Shutdown::Both) {
                if err.kind() != ErrorKind::NotConnected {
                    return Err(TransportError::Io(err));
                }
            }
        }
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

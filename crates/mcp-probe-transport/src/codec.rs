//! Message codec for framing JSON-RPC messages.
//!
//! Stream transports carry newline-delimited JSON (NDJSON): one message per
//! line. The codec reassembles complete lines from arbitrarily chunked byte
//! deliveries and parses each one independently, so a single malformed line
//! never poisons the lines that follow it.

use mcp_probe_protocol::{JsonRpcMessage, JsonRpcRequest};

/// One decoded line from the peer.
#[derive(Debug)]
pub enum Frame {
    /// A well-formed JSON-RPC message.
    Message(JsonRpcMessage),
    /// A complete line that failed to parse as JSON-RPC.
    ///
    /// Reported per line rather than as a codec failure; the bytes after
    /// the offending line remain decodable.
    Malformed {
        /// The offending line, lossily decoded for diagnostics.
        line: String,
        /// Parse failure description.
        detail: String,
    },
}

/// Codec for encoding/decoding JSON-RPC messages.
#[derive(Debug)]
pub struct FrameCodec {
    /// Buffer for incomplete messages.
    buffer: Vec<u8>,
    /// Read position in buffer (data before this has been consumed).
    read_pos: usize,
    /// Maximum allowed message size in bytes.
    max_message_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Threshold for compacting the buffer (when read_pos exceeds this).
const COMPACT_THRESHOLD: usize = 4096;

impl FrameCodec {
    /// Creates a new codec with default settings (10MB limit).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            read_pos: 0,
            max_message_size: 10 * 1024 * 1024, // 10MB
        }
    }

    /// Returns the maximum allowed message size in bytes.
    #[must_use]
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Sets the maximum allowed message size in bytes.
    pub fn set_max_message_size(&mut self, size: usize) {
        self.max_message_size = size;
        let unread = self.buffer.len() - self.read_pos;
        if unread > size {
            self.buffer.clear();
            self.read_pos = 0;
        }
    }

    /// Encodes a request or notification to bytes, appending the `\n`
    /// terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self, request: &JsonRpcRequest) -> Result<Vec<u8>, CodecError> {
        let mut bytes = serde_json::to_vec(request)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Feeds newly received bytes, returning any complete frames.
    ///
    /// Incomplete trailing data is buffered for the next call; a line
    /// terminator split across deliveries and zero or multiple frames per
    /// delivery are both handled. Empty lines are skipped. Unparseable
    /// lines come back as [`Frame::Malformed`] rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the buffered data exceeds the size limit.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Frame>, CodecError> {
        let unread_len = self.buffer.len() - self.read_pos;
        let projected_size = unread_len.saturating_add(data.len());

        // Check projected size BEFORE extending to prevent temporary
        // memory exhaustion.
        if projected_size > self.max_message_size {
            self.buffer.clear();
            self.read_pos = 0;
            return Err(CodecError::MessageTooLarge(projected_size));
        }

        // Compact the buffer once the consumed prefix gets large.
        if self.read_pos >= COMPACT_THRESHOLD {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }

        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        let mut start = self.read_pos;

        #[allow(clippy::mut_range_bound)]
        for i in start..self.buffer.len() {
            if self.buffer[i] == b'\n' {
                let line = &self.buffer[start..i];
                let line = if line.ends_with(b"\r") {
                    &line[..line.len() - 1]
                } else {
                    line
                };
                if !line.is_empty() {
                    match serde_json::from_slice::<JsonRpcMessage>(line) {
                        Ok(msg) => frames.push(Frame::Message(msg)),
                        Err(err) => frames.push(Frame::Malformed {
                            line: String::from_utf8_lossy(line).into_owned(),
                            detail: err.to_string(),
                        }),
                    }
                }
                start = i + 1;
            }
        }

        self.read_pos = start;

        // An undelimited remainder over the limit can never complete.
        let remaining = self.buffer.len() - self.read_pos;
        if remaining > self.max_message_size {
            self.buffer.clear();
            self.read_pos = 0;
            return Err(CodecError::MessageTooLarge(remaining));
        }

        Ok(frames)
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
    }
}

/// Codec error types.
#[derive(Debug)]
pub enum CodecError {
    /// JSON serialization error on the encode path.
    Json(serde_json::Error),
    /// Message too large.
    MessageTooLarge(usize),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Json(e) => write!(f, "JSON error: {e}"),
            CodecError::MessageTooLarge(size) => write!(f, "Message too large: {size} bytes"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Json(e) => Some(e),
            CodecError::MessageTooLarge(_) => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err)
    }
}

//! Subprocess pipe transport.
//!
//! Spawns the MCP server as a child process and carries NDJSON frames over
//! its stdin/stdout. A dedicated reader thread drains the child's stdout in
//! chunks and forwards them over a bounded channel, so `recv` can honor an
//! explicit deadline with `recv_timeout` instead of polling.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use mcp_probe_protocol::JsonRpcRequest;
use wait_timeout::ChildExt;

use crate::{Frame, FrameCodec, READ_CHUNK_SIZE, Transport, TransportError};

/// How long `close` waits for the child to exit after stdin EOF before
/// killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Transport over a spawned server subprocess.
///
/// The child's stderr is inherited; MCP servers log there by convention.
pub struct PipeTransport {
    /// `None` once closed.
    child: Option<Child>,
    /// Dropped on close to signal EOF to the child.
    stdin: Option<ChildStdin>,
    chunks: Receiver<Vec<u8>>,
    reader: Option<thread::JoinHandle<()>>,
    codec: FrameCodec,
    pending: VecDeque<Frame>,
    command: String,
}

impl PipeTransport {
    /// Spawns the server process with piped stdin/stdout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the process cannot be
    /// spawned.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, TransportError> {
        let display = if args.is_empty() {
            command.to_owned()
        } else {
            format!("{command} {}", args.join(" "))
        };

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| TransportError::Connect {
                target: display.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| TransportError::Connect {
            target: display.clone(),
            source: std::io::Error::new(ErrorKind::BrokenPipe, "child stdin unavailable"),
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| TransportError::Connect {
            target: display.clone(),
            source: std::io::Error::new(ErrorKind::BrokenPipe, "child stdout unavailable"),
        })?;

        log::debug!("spawned server process: {display}");

        let (tx, rx) = bounded::<Vec<u8>>(16);
        let reader = thread::spawn(move || {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                match stdout.read(&mut chunk) {
                    // EOF: child exited or closed its stdout.
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => {}
                    Err(err) => {
                        log::debug!("pipe reader stopping: {err}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            chunks: rx,
            reader: Some(reader),
            codec: FrameCodec::new(),
            pending: VecDeque::new(),
            command: display,
        })
    }

    /// Returns the command line the child was spawned with.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Transport for PipeTransport {
    fn send(&mut self, message: &JsonRpcRequest) -> Result<(), TransportError> {
        let stdin = self.stdin.as_mut().ok_or(TransportError::Closed)?;
        let bytes = self.codec.encode(message)?;
        match stdin.write_all(&bytes).and_then(|()| stdin.flush()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => Err(TransportError::Closed),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError> {
        let start = Instant::now();
        let deadline = start + timeout;

        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::Timeout {
                    elapsed: start.elapsed(),
                });
            }

            match self.chunks.recv_timeout(deadline - now) {
                Ok(chunk) => self.pending.extend(self.codec.feed(&chunk)?),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(TransportError::Timeout {
                        elapsed: start.elapsed(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // EOF on stdin asks the server to exit on its own.
        drop(self.stdin.take());

        if let Some(mut child) = self.child.take() {
            match child.wait_timeout(SHUTDOWN_GRACE)? {
                Some(status) => log::debug!("server process exited: {status}"),
                None => {
                    log::warn!(
                        "server process did not exit within {}s, killing",
                        SHUTDOWN_GRACE.as_secs()
                    );
                    child.kill()?;
                    child.wait()?;
                }
            }
        }

        // The child is gone, so its stdout is closed and the reader thread
        // unblocks on EOF.
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        Ok(())
    }
}

impl Drop for PipeTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

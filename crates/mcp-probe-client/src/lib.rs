//! Synchronous JSON-RPC session for the mcp-probe client suite.
//!
//! [`RpcSession`] owns one transport for its lifetime and layers the
//! call/notify semantics on top of it: fresh monotonically increasing
//! request ids, correlation of each reply to the outstanding request, and
//! per-call deadlines. Sessions are strictly non-pipelined; a `call` blocks
//! until its own response, a timeout, or a closed channel.

#![forbid(unsafe_code)]

mod session;

pub use session::{RpcSession, SessionError};

//! JSON-RPC 2.0 message types for the mcp-probe client suite.
//!
//! MCP (Model Context Protocol) speaks JSON-RPC 2.0 over a variety of
//! transports. This crate defines the three message shapes the client side
//! needs:
//!
//! - **Request**: carries a method, optional params, and a caller-chosen id
//! - **Notification**: a request without an id; no reply is awaited
//! - **Response**: carries the originating id and exactly one of
//!   `result` / `error`
//!
//! # Wire Format
//!
//! Over stream transports, messages are newline-delimited JSON (NDJSON):
//! one JSON value per line, UTF-8, terminated by a single `\n`. Over HTTP,
//! the same shapes travel as request/response bodies.

#![forbid(unsafe_code)]

mod jsonrpc;

pub use jsonrpc::{
    JSONRPC_VERSION, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId, ResponsePayload,
    RpcError,
};

//! The transport-agnostic scenario suite.
//!
//! Every transport runs the same MCP exchanges; the assertions care only
//! about JSON-RPC payloads, never about which channel carried them. The
//! HTTP driver additionally exercises the server's plain GET endpoints.

use std::thread;
use std::time::Duration;

use mcp_probe_client::RpcSession;
use mcp_probe_harness::{Outcome, Reporter, TestFailure, ensure, run_test};
use mcp_probe_protocol::{JsonRpcResponse, ResponsePayload};
use mcp_probe_transport::{HttpTransport, Transport};
use serde_json::{Value, json};

/// Protocol revision the exercised servers speak.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Gap between consecutive MusicBrainz tool calls; the upstream API is
/// rate-limited to roughly one request per second.
const MB_REQUEST_GAP: Duration = Duration::from_millis(1500);

/// Unwraps a success result, turning an application error or a shapeless
/// response into a scenario failure.
fn expect_result<'a>(response: &'a JsonRpcResponse, what: &str) -> Result<&'a Value, TestFailure> {
    match response.payload() {
        Some(ResponsePayload::Result(value)) => Ok(value),
        Some(ResponsePayload::Error(err)) => Err(format!("{what} failed: {err}").into()),
        None => Err(format!("{what} returned neither result nor error").into()),
    }
}

fn initialize<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call(
        "initialize",
        Some(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "mcp-probe", "version": env!("CARGO_PKG_VERSION")},
        })),
    )?;
    let result = expect_result(&response, "initialize")?;
    ensure(
        result["protocolVersion"] == json!(PROTOCOL_VERSION),
        format!("unexpected protocolVersion: {}", result["protocolVersion"]),
    )
}

fn list_tools<T: Transport>(session: &mut RpcSession<T>, names: &mut Vec<String>) -> Outcome {
    let response = session.call("tools/list", Some(json!({})))?;
    let result = expect_result(&response, "tools/list")?;
    let tools = result["tools"]
        .as_array()
        .ok_or("missing tools in response")?;
    *names = tools
        .iter()
        .filter_map(|t| t["name"].as_str().map(ToOwned::to_owned))
        .collect();
    ensure(!tools.is_empty(), "server advertises no tools")
}

fn list_resources<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call("resources/list", Some(json!({})))?;
    let result = expect_result(&response, "resources/list")?;
    ensure(
        result.get("resources").is_some_and(Value::is_array),
        "missing resources in response",
    )
}

fn read_resource<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call("resources/read", Some(json!({"uri": "mcp://server/info"})))?;
    let result = expect_result(&response, "resources/read")?;
    ensure(
        result.get("contents").is_some(),
        "missing contents in response",
    )
}

fn list_prompts<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call("prompts/list", Some(json!({})))?;
    let result = expect_result(&response, "prompts/list")?;
    ensure(
        result.get("prompts").is_some_and(Value::is_array),
        "missing prompts in response",
    )
}

fn get_prompt<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call(
        "prompts/get",
        Some(json!({"name": "greeting", "arguments": {"name": "mcp-probe"}})),
    )?;
    let result = expect_result(&response, "prompts/get")?;
    ensure(
        result.get("messages").is_some(),
        "missing messages in response",
    )
}

/// Invokes one tool through `tools/call`.
fn call_tool<T: Transport>(
    session: &mut RpcSession<T>,
    name: &str,
    arguments: Value,
) -> Result<JsonRpcResponse, TestFailure> {
    let response = session.call(
        "tools/call",
        Some(json!({"name": name, "arguments": arguments})),
    )?;
    Ok(response)
}

/// Asserts a successful tool result carrying content.
fn expect_tool_content<'a>(
    response: &'a JsonRpcResponse,
    what: &str,
) -> Result<&'a Value, TestFailure> {
    let result = expect_result(response, what)?;
    ensure(
        result.get("content").is_some(),
        format!("{what}: missing tool content"),
    )?;
    ensure(
        result["isError"] != json!(true),
        format!("{what} reported an error: {result}"),
    )?;
    Ok(result)
}

fn call_fs_list_dir<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = call_tool(session, "fs_list_dir", json!({"path": "."}))?;
    expect_tool_content(&response, "fs_list_dir")?;
    Ok(())
}

fn read_metadata_missing_file<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = call_tool(session, "read_metadata", json!({"path": "/nonexistent/file.mp3"}))?;
    // A missing file is an application-level condition: the server should
    // still answer with a result, possibly flagged isError.
    match response.payload() {
        Some(ResponsePayload::Result(_)) => Ok(()),
        Some(ResponsePayload::Error(err)) => {
            Err(format!("read_metadata rejected at the JSON-RPC layer: {err}").into())
        }
        None => Err("read_metadata returned neither result nor error".into()),
    }
}

fn mb_artist_search<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = call_tool(
        session,
        "mb_artist_search",
        json!({"search_type": "artist", "query": "Nirvana", "limit": 3}),
    )?;
    let result = expect_tool_content(&response, "mb_artist_search")?;
    // When the search produced entries, the first one should actually
    // mention the artist (or the server's "Found N ..." preamble).
    if let Some(first) = result["content"].as_array().and_then(|c| c.first()) {
        let text = first.to_string();
        ensure(
            text.contains("Nirvana") || text.contains("Found"),
            format!("unexpected search content: {text}"),
        )?;
    }
    Ok(())
}

fn mb_tool_search<T: Transport>(
    session: &mut RpcSession<T>,
    tool: &str,
    arguments: Value,
) -> Outcome {
    let response = call_tool(session, tool, arguments)?;
    expect_tool_content(&response, tool)?;
    Ok(())
}

fn tool_call_missing_arguments<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    // No "arguments" field at all; the server must answer gracefully
    // rather than drop the connection.
    let response = session.call("tools/call", Some(json!({"name": "echo"})))?;
    ensure(
        response.payload().is_some(),
        "response carried neither result nor error",
    )
}

fn tool_call_wrong_argument_types<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = call_tool(
        session,
        "add",
        json!({"a": "not_a_number", "b": "also_not_a_number"}),
    )?;
    ensure(
        response.payload().is_some(),
        "response carried neither result nor error",
    )
}

fn unknown_method_is_rejected<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call("no/such/method", None)?;
    match response.payload() {
        Some(ResponsePayload::Error(err)) => ensure(
            err.code == -32601,
            format!("expected code -32601, got {}", err.code),
        ),
        _ => Err("unknown method was not rejected".into()),
    }
}

fn unknown_tool_is_rejected<T: Transport>(session: &mut RpcSession<T>) -> Outcome {
    let response = session.call(
        "tools/call",
        Some(json!({"name": "definitely_not_a_tool", "arguments": {}})),
    )?;
    // Servers may reject either at the JSON-RPC layer or via isError.
    let rejected = match response.payload() {
        Some(ResponsePayload::Error(_)) => true,
        Some(ResponsePayload::Result(result)) => result["isError"] == json!(true),
        None => false,
    };
    ensure(rejected, "unknown tool was not rejected")
}

/// Runs the shared protocol suite against one session.
pub fn protocol_suite<T: Transport>(session: &mut RpcSession<T>, reporter: &mut Reporter) {
    reporter.section("MCP Protocol Tests");

    reporter.record(run_test("Initialize session", || initialize(session)));
    match session.notify("notifications/initialized", None) {
        Ok(()) => reporter.note("sent initialized notification"),
        Err(err) => log::warn!("initialized notification failed: {err}"),
    }

    let mut tool_names = Vec::new();
    reporter.record(run_test("List tools", || {
        list_tools(session, &mut tool_names)
    }));
    if !tool_names.is_empty() {
        reporter.note(&format!("tools: {}", tool_names.join(", ")));
    }

    reporter.record(run_test("List resources", || list_resources(session)));
    reporter.record(run_test("Read resource (mcp://server/info)", || {
        read_resource(session)
    }));
    reporter.record(run_test("List prompts", || list_prompts(session)));
    reporter.record(run_test("Get prompt (greeting)", || get_prompt(session)));

    reporter.section("Filesystem Tools Tests");
    reporter.record(run_test("fs_list_dir tool", || call_fs_list_dir(session)));

    reporter.section("Metadata Tools Tests");
    reporter.record(run_test("read_metadata (nonexistent file)", || {
        read_metadata_missing_file(session)
    }));

    reporter.section("MusicBrainz API Tools Tests");
    reporter.note("these hit the live MusicBrainz API; pausing between calls");
    reporter.record(run_test("Artist search (Nirvana)", || {
        mb_artist_search(session)
    }));
    thread::sleep(MB_REQUEST_GAP);
    reporter.record(run_test("Release search (OK Computer)", || {
        mb_tool_search(
            session,
            "mb_release_search",
            json!({"search_type": "release", "query": "OK Computer", "limit": 3}),
        )
    }));
    thread::sleep(MB_REQUEST_GAP);
    reporter.record(run_test("Recording search (Paranoid Android)", || {
        mb_tool_search(
            session,
            "mb_recording_search",
            json!({"search_type": "recording", "query": "Paranoid Android", "limit": 3}),
        )
    }));
    thread::sleep(MB_REQUEST_GAP);
    reporter.record(run_test("Advanced search (label: Sony)", || {
        mb_tool_search(
            session,
            "mb_advanced_search",
            json!({"entity": "label", "query": "Sony", "limit": 3}),
        )
    }));

    reporter.section("Error Handling Tests");
    reporter.record(run_test("Unknown method returns -32601", || {
        unknown_method_is_rejected(session)
    }));
    reporter.record(run_test("Unknown tool is rejected", || {
        unknown_tool_is_rejected(session)
    }));
    reporter.record(run_test("Missing required parameters", || {
        tool_call_missing_arguments(session)
    }));
    reporter.record(run_test("Wrong parameter types", || {
        tool_call_wrong_argument_types(session)
    }));
}

/// Exercises the HTTP server's plain GET endpoints.
pub fn http_endpoints(transport: &HttpTransport, reporter: &mut Reporter) {
    reporter.section("Basic Connectivity Tests");

    reporter.record(run_test("Health check endpoint", || {
        let health = transport.health()?;
        ensure(
            health["status"] == json!("healthy"),
            format!("Got: {health}"),
        )
    }));

    reporter.record(run_test("Root info endpoint", || {
        let info = transport.server_info()?;
        ensure(
            info["protocol"] == json!("JSON-RPC 2.0"),
            format!("Got: {info}"),
        )
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_probe_protocol::{JsonRpcRequest, RequestId};
    use mcp_probe_transport::{Frame, TransportError};
    use std::time::Duration;

    /// Answers every request with one canned result object; drops
    /// notifications.
    struct CannedServer {
        result: Value,
        pending: Vec<i64>,
    }

    impl Transport for CannedServer {
        fn send(&mut self, message: &JsonRpcRequest) -> Result<(), TransportError> {
            if let Some(RequestId::Number(id)) = &message.id {
                self.pending.push(*id);
            }
            Ok(())
        }

        fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError> {
            let Some(id) = self.pending.pop() else {
                return Err(TransportError::Timeout { elapsed: timeout });
            };
            let line = json!({"jsonrpc": "2.0", "id": id, "result": self.result.clone()});
            Ok(Frame::Message(serde_json::from_value(line).unwrap()))
        }

        fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn canned_session(result: Value) -> RpcSession<CannedServer> {
        RpcSession::with_timeout(
            CannedServer {
                result,
                pending: Vec::new(),
            },
            Duration::from_millis(100),
        )
    }

    #[test]
    fn test_suite_against_fully_stocked_server() {
        let mut session = canned_session(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "tools": [{"name": "fs_list_dir"}],
            "resources": [],
            "contents": [],
            "prompts": [],
            "messages": [],
            "content": [],
        }));
        let mut reporter = Reporter::new();
        protocol_suite(&mut session, &mut reporter);

        let results = reporter.results();
        assert_eq!(results.len(), 16);
        // Everything except the unknown-method and unknown-tool scenarios
        // passes: the canned server never rejects anything, and the
        // missing/mistyped-parameter scenarios only require a graceful
        // response.
        let failed: Vec<_> = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(
            failed,
            vec!["Unknown method returns -32601", "Unknown tool is rejected"]
        );
    }

    #[test]
    fn test_read_metadata_accepts_is_error_result() {
        let mut session = canned_session(json!({
            "content": [{"type": "text", "text": "No such file"}],
            "isError": true,
        }));
        assert!(read_metadata_missing_file(&mut session).is_ok());
    }

    #[test]
    fn test_artist_search_rejects_unrelated_content() {
        let mut session = canned_session(json!({
            "content": [{"type": "text", "text": "something else entirely"}],
        }));
        let result = run_test("mb", || mb_artist_search(&mut session));
        assert!(!result.passed);
        assert!(result.message.contains("unexpected search content"));
    }

    #[test]
    fn test_artist_search_accepts_matching_content() {
        let mut session = canned_session(json!({
            "content": [{"type": "text", "text": "Found 3 artists:\n1. Nirvana"}],
        }));
        assert!(mb_artist_search(&mut session).is_ok());
    }

    #[test]
    fn test_missing_arguments_scenario_accepts_any_well_formed_reply() {
        let mut session = canned_session(json!({
            "content": [{"type": "text", "text": "arguments are required"}],
            "isError": true,
        }));
        assert!(tool_call_missing_arguments(&mut session).is_ok());
        // The session stays usable afterwards.
        assert!(tool_call_wrong_argument_types(&mut session).is_ok());
    }

    #[test]
    fn test_initialize_rejects_wrong_protocol_version() {
        let mut session = canned_session(json!({"protocolVersion": "1999-01-01"}));
        let result = run_test("init", || initialize(&mut session));
        assert!(!result.passed);
        assert!(result.message.contains("protocolVersion"));
    }

    #[test]
    fn test_unknown_method_scenario_accepts_error_response() {
        struct Rejecting;
        impl Transport for Rejecting {
            fn send(&mut self, _message: &JsonRpcRequest) -> Result<(), TransportError> {
                Ok(())
            }
            fn recv(&mut self, _timeout: Duration) -> Result<Frame, TransportError> {
                Ok(Frame::Message(
                    serde_json::from_str(
                        r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
                    )
                    .unwrap(),
                ))
            }
            fn close(&mut self) -> Result<(), TransportError> {
                Ok(())
            }
        }

        let mut session = RpcSession::with_timeout(Rejecting, Duration::from_millis(100));
        assert!(unknown_method_is_rejected(&mut session).is_ok());
    }
}

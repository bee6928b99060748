//! Session-over-TCP integration tests against scripted in-process servers.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use mcp_probe_client::{RpcSession, SessionError};
use mcp_probe_transport::TcpTransport;
use serde_json::{Value, json};

/// Spawns a one-connection scripted server; the script gets the accepted
/// stream.
fn scripted_server(
    script: impl FnOnce(TcpStream) + Send + 'static,
) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        script(stream);
    });
    (port, handle)
}

fn read_request(reader: &mut impl BufRead) -> Value {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    serde_json::from_str(&line).unwrap()
}

fn write_line(stream: &mut TcpStream, value: &Value) {
    let mut bytes = serde_json::to_vec(value).unwrap();
    bytes.push(b'\n');
    stream.write_all(&bytes).unwrap();
}

fn session(port: u16, timeout: Duration) -> RpcSession<TcpTransport> {
    RpcSession::with_timeout(TcpTransport::connect("127.0.0.1", port).unwrap(), timeout)
}

#[test]
fn initialize_roundtrip_with_split_response() {
    let (port, handle) = scripted_server(|mut stream| {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let request = read_request(&mut reader);
        assert_eq!(request["method"], json!("initialize"));
        let id = request["id"].as_i64().unwrap();

        // Deliver the reply in two chunks to exercise reassembly.
        let reply = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"protocolVersion": "2024-11-05"},
        });
        let mut bytes = serde_json::to_vec(&reply).unwrap();
        bytes.push(b'\n');
        let (head, tail) = bytes.split_at(bytes.len() / 2);
        stream.write_all(head).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(30));
        stream.write_all(tail).unwrap();
    });

    let mut session = session(port, Duration::from_secs(5));
    let response = session
        .call("initialize", Some(json!({"protocolVersion": "2024-11-05"})))
        .unwrap();
    assert_eq!(
        response.result().unwrap()["protocolVersion"],
        json!("2024-11-05")
    );
    handle.join().unwrap();
}

#[test]
fn notification_then_call_share_the_connection() {
    let (port, handle) = scripted_server(|mut stream| {
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let notification = read_request(&mut reader);
        assert_eq!(notification["method"], json!("notifications/initialized"));
        assert!(notification.get("id").is_none());

        let request = read_request(&mut reader);
        let id = request["id"].as_i64().unwrap();
        write_line(
            &mut stream,
            &json!({"jsonrpc": "2.0", "id": id, "result": {"tools": []}}),
        );
    });

    let mut session = session(port, Duration::from_secs(5));
    session.notify("notifications/initialized", None).unwrap();
    let response = session.call("tools/list", None).unwrap();
    assert!(response.result().is_some());
    handle.join().unwrap();
}

#[test]
fn timeout_is_bounded_and_session_recovers() {
    let (port, handle) = scripted_server(|mut stream| {
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        // Never answer the first request.
        let _ = read_request(&mut reader);

        // Answer the second one.
        let request = read_request(&mut reader);
        let id = request["id"].as_i64().unwrap();
        write_line(
            &mut stream,
            &json!({"jsonrpc": "2.0", "id": id, "result": {}}),
        );
    });

    let mut session = session(port, Duration::from_secs(5));

    let start = Instant::now();
    let err = session
        .call_with_timeout("slow/method", None, Duration::from_millis(200))
        .unwrap_err();
    let waited = start.elapsed();
    match err {
        SessionError::Timeout { ref method, .. } => assert_eq!(method, "slow/method"),
        ref other => panic!("expected timeout, got {other}"),
    }
    assert!(waited >= Duration::from_millis(200));
    assert!(waited < Duration::from_millis(2000), "waited {waited:?}");

    // The connection stays open; the next call succeeds.
    let response = session.call("tools/list", None).unwrap();
    assert!(response.result().is_some());
    handle.join().unwrap();
}

#[test]
fn stale_reply_after_timeout_is_a_protocol_error() {
    let (port, handle) = scripted_server(|mut stream| {
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        // Reply to the first request, but only after the caller has
        // already given up on it.
        let first = read_request(&mut reader);
        let first_id = first["id"].as_i64().unwrap();
        thread::sleep(Duration::from_millis(300));
        write_line(
            &mut stream,
            &json!({"jsonrpc": "2.0", "id": first_id, "result": {}}),
        );

        // Keep the connection alive for the second exchange.
        let _ = read_request(&mut reader);
        thread::sleep(Duration::from_millis(100));
    });

    let mut session = session(port, Duration::from_secs(5));

    let err = session
        .call_with_timeout("slow/method", None, Duration::from_millis(100))
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeout { .. }), "{err}");

    // The next call reads the stale reply for the abandoned request.
    let err = session.call("tools/list", None).unwrap_err();
    match err {
        SessionError::Protocol { ref detail } => {
            assert!(detail.contains("expected response id 2"), "{detail}");
        }
        ref other => panic!("expected protocol error, got {other}"),
    }
    handle.join().unwrap();
}

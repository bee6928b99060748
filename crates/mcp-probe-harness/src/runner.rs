//! Scenario execution.

use std::time::Instant;

use mcp_probe_client::SessionError;
use mcp_probe_transport::TransportError;

/// What a scenario body returns.
pub type Outcome = Result<(), TestFailure>;

/// A scenario failure description.
///
/// Converts from the session/transport error types and from plain strings
/// so scenario bodies can use `?` on calls and still `return Err("…".into())`
/// for assertion failures.
#[derive(Debug)]
pub struct TestFailure(String);

impl std::fmt::Display for TestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestFailure {
    fn from(msg: &str) -> Self {
        TestFailure(msg.to_owned())
    }
}

impl From<String> for TestFailure {
    fn from(msg: String) -> Self {
        TestFailure(msg)
    }
}

impl From<SessionError> for TestFailure {
    fn from(err: SessionError) -> Self {
        TestFailure(err.to_string())
    }
}

impl From<TransportError> for TestFailure {
    fn from(err: TransportError) -> Self {
        TestFailure(err.to_string())
    }
}

impl From<serde_json::Error> for TestFailure {
    fn from(err: serde_json::Error) -> Self {
        TestFailure(format!("unexpected payload shape: {err}"))
    }
}

/// Fails the scenario unless `cond` holds.
pub fn ensure(cond: bool, msg: impl Into<String>) -> Outcome {
    if cond { Ok(()) } else { Err(TestFailure(msg.into())) }
}

/// The recorded outcome of one scenario.
///
/// Immutable once produced; owned by the [`crate::Reporter`] for the rest
/// of the run.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Scenario name.
    pub name: String,
    /// Whether the scenario passed.
    pub passed: bool,
    /// Failure description; empty on success.
    pub message: String,
    /// Wall-clock duration of the scenario body.
    pub duration_ms: f64,
}

/// Runs one scenario, converting a failure into a failed result.
///
/// Duration is recorded regardless of outcome.
pub fn run_test(name: &str, body: impl FnOnce() -> Outcome) -> TestResult {
    log::debug!("running scenario: {name}");
    let start = Instant::now();
    let outcome = body();
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(()) => TestResult {
            name: name.to_owned(),
            passed: true,
            message: String::new(),
            duration_ms,
        },
        Err(failure) => TestResult {
            name: name.to_owned(),
            passed: false,
            message: failure.to_string(),
            duration_ms,
        },
    }
}

//! Scenario runner and result reporting for the mcp-probe client suite.
//!
//! A scenario is a closure that issues calls/notifications against a
//! session and returns `Result<(), TestFailure>`. [`run_test`] executes
//! one scenario, always measuring its wall-clock duration and converting
//! failures into a [`TestResult`]; the [`Reporter`] aggregates results,
//! prints per-scenario lines and a summary, and decides the process exit
//! status. One scenario's failure never aborts the suite.

#![forbid(unsafe_code)]

mod report;
mod runner;

pub use report::Reporter;
pub use runner::{Outcome, TestFailure, TestResult, ensure, run_test};

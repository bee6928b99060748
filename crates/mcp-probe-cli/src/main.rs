//! mcp-probe - exercise an MCP server over TCP, stdio pipes, or HTTP.
//!
//! Each subcommand drives the same protocol scenario suite through a
//! different transport:
//! - `tcp` - connect to a raw TCP listener
//! - `stdio` - spawn the server as a subprocess and talk over its pipes
//! - `http` - POST one JSON-RPC body per call
//!
//! Exit status is 0 only if every scenario passed.

#![forbid(unsafe_code)]

mod logging;
mod scenarios;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;

use mcp_probe_client::RpcSession;
use mcp_probe_harness::Reporter;
use mcp_probe_transport::{HttpTransport, PipeTransport, TcpTransport, Transport, TransportError};

/// Default port of the server's TCP listener.
const DEFAULT_TCP_PORT: u16 = 4000;
/// Default port of the server's HTTP listener.
const DEFAULT_HTTP_PORT: u16 = 9090;

/// Exercise an MCP server over TCP, stdio pipes, or HTTP.
#[derive(Parser)]
#[command(name = "mcp-probe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Per-call timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Increase log verbosity on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exercise a server listening on a raw TCP socket.
    Tcp {
        /// Server port.
        #[arg(default_value_t = DEFAULT_TCP_PORT)]
        port: u16,

        /// Server host.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Spawn a server subprocess and exercise it over stdin/stdout.
    Stdio {
        /// Server command or path (default runs the server from the
        /// current Cargo project).
        command: Option<String>,

        /// Arguments to pass to the server.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Exercise a server over HTTP POST.
    Http {
        /// Server port.
        #[arg(default_value_t = DEFAULT_HTTP_PORT)]
        port: u16,

        /// Server host.
        #[arg(long, default_value = "localhost")]
        host: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let timeout = Duration::from_secs(cli.timeout);

    let all_passed = match cli.command {
        Commands::Tcp { port, host } => run_tcp(&host, port, timeout),
        Commands::Stdio { command, args } => match command {
            Some(command) => run_stdio(&command, &args, timeout),
            None => run_stdio("cargo", &["run".to_owned(), "--release".to_owned()], timeout),
        },
        Commands::Http { port, host } => run_http(&host, port, timeout),
    };

    match all_passed {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{} {err}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Runs the shared suite over an established session and closes it.
fn run_suite<T: Transport>(transport: T, timeout: Duration, mut reporter: Reporter) -> bool {
    let mut session = RpcSession::with_timeout(transport, timeout);
    scenarios::protocol_suite(&mut session, &mut reporter);
    if let Err(err) = session.close() {
        log::warn!("close failed: {err}");
    }
    reporter.summary()
}

fn run_tcp(host: &str, port: u16, timeout: Duration) -> Result<bool, TransportError> {
    let transport = match TcpTransport::connect(host, port) {
        Ok(transport) => transport,
        Err(err) if err.is_connect() => {
            eprintln!("{} {err}", style("error:").red().bold());
            eprintln!("Is the MCP server running? Start it with:");
            eprintln!("    cargo run --features tcp");
            return Ok(false);
        }
        Err(err) => return Err(err),
    };
    println!("Connected to {}", transport.peer());
    Ok(run_suite(transport, timeout, Reporter::new()))
}

fn run_stdio(command: &str, args: &[String], timeout: Duration) -> Result<bool, TransportError> {
    let transport = match PipeTransport::spawn(command, args) {
        Ok(transport) => transport,
        Err(err) if err.is_connect() => {
            eprintln!("{} {err}", style("error:").red().bold());
            eprintln!("Check that the server command exists and is executable.");
            return Ok(false);
        }
        Err(err) => return Err(err),
    };
    println!("Started server: {}", transport.command());
    Ok(run_suite(transport, timeout, Reporter::new()))
}

fn run_http(host: &str, port: u16, timeout: Duration) -> Result<bool, TransportError> {
    let base_url = format!("http://{host}:{port}");
    let transport = HttpTransport::with_timeout(&base_url, timeout)?;

    // Probe connectivity before reporting any scenarios, so a server that
    // simply is not there produces guidance instead of a wall of failures.
    if let Err(err) = transport.health() {
        if err.is_connect() {
            eprintln!("{} {err}", style("error:").red().bold());
            eprintln!("Is the MCP server running? Start it with:");
            eprintln!("    cargo run --features http");
            return Ok(false);
        }
    }

    let mut reporter = Reporter::new();
    scenarios::http_endpoints(&transport, &mut reporter);
    Ok(run_suite(transport, timeout, reporter))
}

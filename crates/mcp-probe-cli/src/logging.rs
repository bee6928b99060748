//! Stderr logger for the driver binary.
//!
//! A small `log` crate logger: styled level tag, target, message. Scenario
//! output goes to stdout via the reporter; diagnostics stay on stderr so
//! the two never interleave into one stream.

use console::style;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    max_level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => style("ERROR").red().bold(),
            Level::Warn => style(" WARN").yellow().bold(),
            Level::Info => style(" INFO").green(),
            Level::Debug => style("DEBUG").dim(),
            Level::Trace => style("TRACE").dim(),
        };
        eprintln!("{level} [{}] {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Installs the global logger; `verbosity` is the count of `-v` flags.
pub fn init(verbosity: u8) {
    let max_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_boxed_logger(Box::new(StderrLogger { max_level })).is_ok() {
        log::set_max_level(max_level);
    }
}

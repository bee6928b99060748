//! Result aggregation and console output.

use console::style;

use crate::TestResult;

/// Width of section header rules.
const HEADER_WIDTH: usize = 60;

/// Longest failure excerpt shown under a failed scenario line.
const FAILURE_PREVIEW_LEN: usize = 150;

/// Collects [`TestResult`]s, printing each as it arrives plus a final
/// summary.
#[derive(Debug, Default)]
pub struct Reporter {
    results: Vec<TestResult>,
}

impl Reporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints a section header.
    pub fn section(&self, title: &str) {
        println!("\n{}", "=".repeat(HEADER_WIDTH));
        println!("  {title}");
        println!("{}", "=".repeat(HEADER_WIDTH));
    }

    /// Prints a free-form note under the previous result line.
    pub fn note(&self, text: &str) {
        println!("  {} {}", style("↳").dim(), style(text).dim());
    }

    /// Records one result, printing its status line.
    pub fn record(&mut self, result: TestResult) {
        let status = if result.passed {
            style("PASS").green().bold()
        } else {
            style("FAIL").red().bold()
        };
        let duration = if result.duration_ms > 0.0 {
            format!(" ({:.0}ms)", result.duration_ms)
        } else {
            String::new()
        };
        println!("{status} | {}{duration}", result.name);

        if !result.passed {
            println!(
                "       └── {}",
                style(truncate(&result.message, FAILURE_PREVIEW_LEN)).red()
            );
        }
        self.results.push(result);
    }

    /// Returns the recorded results.
    #[must_use]
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Returns true if every recorded result passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Prints the run summary and returns [`Reporter::all_passed`].
    pub fn summary(&self) -> bool {
        let total = self.results.len();
        let passed = self.results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        let total_ms: f64 = self.results.iter().map(|r| r.duration_ms).sum();

        self.section("Summary");
        println!("  Total:  {total}");
        println!("  Passed: {}", style(passed).green());
        if failed > 0 {
            println!("  Failed: {}", style(failed).red());
        } else {
            println!("  Failed: {failed}");
        }
        println!("  Time:   {total_ms:.0}ms");

        if failed > 0 {
            println!("\n  Failures:");
            for result in self.results.iter().filter(|r| !r.passed) {
                println!(
                    "  - {}: {}",
                    result.name,
                    truncate(&result.message, FAILURE_PREVIEW_LEN)
                );
            }
        }

        self.all_passed()
    }
}

/// Truncates on a character boundary, appending an ellipsis when cut.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_owned()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

//! Output formatting and progress reporting

use clap::ValueEnum;
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result format on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON report document
    Json,
}

/// Progress reporter for a suite run; everything goes to stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("✓", "PASS", &Style::new().green().bold());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = self.prefix("✗", "FAIL", &Style::new().red().bold());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("-", "SKIP", &Style::new().yellow());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("⚠", "WARN", &Style::new().yellow().bold());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("ℹ", "INFO", &Style::new().blue().bold());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.line("");
        self.line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        self.line("");
        self.line(&self.summary_line(passed, failed, skipped, duration));
    }

    fn summary_line(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) -> String {
        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();
        let status = if failed > 0 { "FAILED" } else { "PASSED" };

        if !self.use_color {
            return format!(
                "{status} {total} cases in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            );
        }

        let passed_style = Style::new().green().bold();
        let failed_style = Style::new().red().bold();
        let skipped_style = Style::new().yellow();
        let status = if failed > 0 {
            failed_style.apply_to(status)
        } else {
            passed_style.apply_to(status)
        };
        format!(
            "{} {} cases in {:.2}s ({} passed, {} failed, {} skipped)",
            status,
            total,
            duration_secs,
            passed_style.apply_to(passed),
            if failed > 0 {
                failed_style.apply_to(failed).to_string()
            } else {
                failed.to_string()
            },
            skipped_style.apply_to(skipped)
        )
    }

    fn prefix(&self, symbol: &str, plain: &str, styled: &Style) -> String {
        if self.use_color {
            styled.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    // Lines printed under an active bar must go through it or they get overdrawn.
    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_finished() => pb.println(text),
            _ => {
                let _ = self.term.write_line(text);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod output_format_tests {
        use super::*;

        #[test]
        fn test_default_format() {
            assert_eq!(OutputFormat::default(), OutputFormat::Text);
        }

        #[test]
        fn test_parse_from_str() {
            assert_eq!(
                OutputFormat::from_str("json", true).unwrap(),
                OutputFormat::Json
            );
            assert!(OutputFormat::from_str("tap", true).is_err());
        }
    }

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(true, false);
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_default_reporter() {
            let reporter = ProgressReporter::default();
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_quiet_reporter_has_no_bar() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_progress(9, "starting");
            assert!(reporter.progress_bar.is_none());
            reporter.increment(1);
            reporter.finish();
        }

        #[test]
        fn test_messages_do_not_panic() {
            let reporter = ProgressReporter::new(false, false);
            reporter.header("Regression suite");
            reporter.success("TC_REG_001");
            reporter.failure("TC_REG_002: timed out");
            reporter.skipped("TC_REG_003");
            reporter.warning("slow");
            reporter.info("done");
        }

        #[test]
        fn test_plain_summary_line() {
            let reporter = ProgressReporter::new(false, false);
            let line = reporter.summary_line(7, 1, 1, Duration::from_millis(2_500));
            assert_eq!(
                line,
                "FAILED 9 cases in 2.50s (7 passed, 1 failed, 1 skipped)"
            );
        }

        #[test]
        fn test_plain_summary_line_all_passed() {
            let reporter = ProgressReporter::new(false, false);
            let line = reporter.summary_line(9, 0, 0, Duration::from_secs(1));
            assert!(line.starts_with("PASSED 9 cases"));
        }
    }
}

//! Human-readable text output formatter

use super::OutputFormatter;
use crate::runner::BatchResult;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Print progress lines before the summary
    pub show_logs: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_logs: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    pub fn with_logs(mut self, show: bool) -> Self {
        self.show_logs = show;
        self
    }

    fn format_log(&self, line: &str) -> String {
        if !self.colored {
            return line.to_string();
        }
        if line.starts_with("Error") {
            line.red().to_string()
        } else if line.starts_with("Detected") {
            line.cyan().to_string()
        } else if line.starts_with("Processing stopped") {
            line.yellow().to_string()
        } else {
            line.to_string()
        }
    }

    fn paint(&self, s: String, style: fn(ColoredString) -> ColoredString) -> String {
        if self.colored {
            style(s.normal()).to_string()
        } else {
            s
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &BatchResult) -> String {
        let mut output = String::new();

        if self.show_logs {
            for line in &result.logs {
                output.push_str(&self.format_log(line));
                output.push('\n');
            }
            if !result.logs.is_empty() {
                output.push('\n');
            }
        }

        let passed = self.paint(format!("{} passed", result.passed), |s| s.green());
        let failed = if result.failed > 0 {
            self.paint(format!("{} failed", result.failed), |s| s.red().bold())
        } else {
            format!("{} failed", result.failed)
        };
        output.push_str(&format!(
            "{} {} checked: {}, {}\n",
            result.total(),
            if result.total() == 1 { "file" } else { "files" },
            passed,
            failed
        ));

        if result.stopped {
            let notice = "Stopped before all files were processed\n".to_string();
            output.push_str(&self.paint(notice, |s| s.yellow()));
        }

        if !result.report_path.as_os_str().is_empty() {
            output.push_str(&format!("Report: {}\n", result.report_path.display()));
        }

        output
    }
}

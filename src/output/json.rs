//! JSON output formatter

use super::OutputFormatter;
use crate::runner::BatchResult;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &BatchResult) -> String {
        let json = if self.pretty {
            serde_json::to_string_pretty(result)
        } else {
            serde_json::to_string(result)
        };
        json.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

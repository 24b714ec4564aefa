//! Summary formatters for a finished run

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::{ColorMode, OutputConfig, OutputFormat};
use crate::runner::BatchResult;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the whole run summary
    fn format(&self, result: &BatchResult) -> String;
}

/// Pick the formatter for the configured output
pub fn formatter_for(output: &OutputConfig) -> Box<dyn OutputFormatter> {
    match output.format {
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Text => {
            let formatter = TextFormatter::new().with_logs(output.verbose);
            match output.color {
                ColorMode::Never => Box::new(formatter.without_color()),
                ColorMode::Always | ColorMode::Auto => Box::new(formatter),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_for_json() {
        let output = OutputConfig {
            format: OutputFormat::Json,
            ..Default::default()
        };
        let text = formatter_for(&output).format(&BatchResult::default());
        assert!(text.trim_start().starts_with('{'));
    }

    #[test]
    fn test_formatter_for_text_without_color() {
        let output = OutputConfig {
            color: ColorMode::Never,
            ..Default::default()
        };
        let text = formatter_for(&output).format(&BatchResult::default());
        assert!(text.contains("0 passed"));
        assert!(!text.contains('\u{1b}'));
    }
}

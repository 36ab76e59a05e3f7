//! Output formatting and display
//!
//! Results are printed by [`ConsoleSink`] as they stream in; the closing
//! summary and the optional JSON dump are rendered from the final
//! [`RunOutcome`].

mod console;
mod formatter;

pub use console::ConsoleSink;
pub use formatter::{label, mask_ip, FormattingOptions, PerformanceLevel, ResultFormatter};

use crate::error::Result;
use crate::models::Config;
use crate::orchestrator::RunOutcome;

/// Output formatting factory
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    pub fn create_formatter(config: &Config) -> ResultFormatter {
        ResultFormatter::new(FormattingOptions {
            enable_color: config.enable_color,
            show_full_ip: config.show_full_ip,
        })
    }

    /// Plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> ResultFormatter {
        ResultFormatter::new(FormattingOptions::default())
    }
}

/// Pretty-printed JSON of the whole outcome
pub fn format_json(outcome: &RunOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

//! Streaming console sink

use super::formatter::ResultFormatter;
use crate::error::{AppError, Result};
use crate::orchestrator::ResultSink;
use crate::types::{ProbeKey, ProbeResult};
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

/// Prints one line per result the moment it arrives
pub struct ConsoleSink {
    formatter: ResultFormatter,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Sink writing to stdout
    pub fn new(formatter: ResultFormatter) -> Self {
        Self::with_writer(formatter, Box::new(io::stdout()))
    }

    pub fn with_writer(formatter: ResultFormatter, writer: Box<dyn Write + Send>) -> Self {
        Self {
            formatter,
            writer: Mutex::new(writer),
        }
    }

    pub fn formatter(&self) -> &ResultFormatter {
        &self.formatter
    }
}

#[async_trait]
impl ResultSink for ConsoleSink {
    async fn deliver(&self, key: &ProbeKey, result: &ProbeResult) -> Result<()> {
        let line = self.formatter.format_result(key, result);
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AppError::sink("console writer lock poisoned"))?;
        writeln!(writer, "{}", line).map_err(|e| AppError::sink(format!("console write failed: {}", e)))?;
        writer.flush().map_err(|e| AppError::sink(format!("console flush failed: {}", e)))?;
        Ok(())
    }
}

//! Structured logging system for the network status checker
//!
//! This module provides:
//! - Structured logging with multiple levels and contexts
//! - Console, JSON and compact output formats
//! - Run-scoped correlation IDs so every line of one probe run can be grouped
//! - An in-memory capture target used by tests and embedders

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::types::{ProbeKey, ProbeResult, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Where formatted entries go
#[derive(Debug, Clone)]
enum LogTarget {
    /// stderr for warnings and above, stdout otherwise
    Stdio,
    /// Kept in memory, unformatted
    Memory(Arc<Mutex<Vec<LogEntry>>>),
}

/// Shared logging context for correlation
#[derive(Debug, Default)]
struct LogContext {
    /// Current run correlation ID
    run_id: Option<String>,
    /// Additional context fields
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Debug, Clone)]
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
    /// Output format
    format: LogFormat,
    /// Logger name
    name: String,
    target: LogTarget,
    /// Shared context storage
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            target: LogTarget::Stdio,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            target: LogTarget::Stdio,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger that records every entry in memory
    pub fn capturing(name: String) -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            min_level: LogLevel::Trace,
            use_color: false,
            format: LogFormat::Compact,
            name,
            target: LogTarget::Memory(buffer.clone()),
            context: Arc::new(RwLock::new(LogContext::default())),
        };
        (logger, buffer)
    }

    /// Derive a logger with another name sharing the same context and target
    pub fn named(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set output format
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Enable or disable colored output
    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set run correlation ID attached to subsequent entries
    pub async fn set_run_id(&self, run_id: String) {
        let mut context = self.context.write().await;
        context.run_id = Some(run_id);
    }

    /// Clear the run correlation ID once its run is over
    pub async fn clear_run_id(&self) {
        let mut context = self.context.write().await;
        context.run_id = None;
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Write log entry to output
    async fn write_entry(&self, mut entry: LogEntry) {
        // Don't output if below minimum level
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.run_id.clone();
        }
        for (key, value) in &context.context_fields {
            entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        drop(context);

        match &self.target {
            LogTarget::Memory(buffer) => {
                if let Ok(mut entries) = buffer.lock() {
                    entries.push(entry);
                }
            }
            LogTarget::Stdio => {
                let output = match self.format {
                    LogFormat::Console => self.format_console(&entry),
                    LogFormat::Json => self.format_json(&entry),
                    LogFormat::Compact => self.format_compact(&entry),
                };

                // Write to stderr for errors/warnings, stdout for others
                if entry.level >= LogLevel::Warn {
                    let _ = writeln!(io::stderr(), "{}", output);
                } else {
                    let _ = writeln!(io::stdout(), "{}", output);
                }
            }
        }
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields_str: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields_str.sort();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    /// Format log entry in compact format
    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add probe outcome information
    pub fn result_info(self, key: &ProbeKey, result: &ProbeResult) -> Self {
        let builder = self
            .field("probe", key.as_str())
            .field("success", result.is_success());
        match result.failure() {
            Some(kind) => builder.field("failure", kind.to_string()),
            None => builder,
        }
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Specialized logger for probe runs
#[derive(Debug, Clone)]
pub struct RunLogger {
    logger: Logger,
}

impl RunLogger {
    /// Create a run logger from application configuration
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("RUN".to_string(), config),
        }
    }

    /// Wrap an existing logger (e.g. a capturing one)
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Start correlating entries with a run
    pub async fn run_started(&self, run_id: &str, planned: usize) {
        self.logger.set_run_id(run_id.to_string()).await;
        self.logger.info(&format!("Run started with {} planned probes", planned))
            .field("planned", planned)
            .log()
            .await;
    }

    pub async fn session_opened(&self, session_id: &str) {
        self.logger.debug("Session opened")
            .field("session_id", session_id)
            .log()
            .await;
    }

    pub async fn session_closed(&self, session_id: &str, lifetime: Duration, outstanding_leases: usize) {
        let level = if outstanding_leases == 0 { LogLevel::Debug } else { LogLevel::Warn };
        self.logger.log(level, &format!("Session closed after {:.1}ms", lifetime.as_secs_f64() * 1000.0))
            .field("session_id", session_id)
            .field("outstanding_leases", outstanding_leases)
            .log()
            .await;
    }

    pub async fn probe_launched(&self, key: &ProbeKey, wave: &str) {
        self.logger.debug(&format!("Launched probe {}", key))
            .field("probe", key.as_str())
            .field("wave", wave)
            .log()
            .await;
    }

    pub async fn probe_completed(&self, key: &ProbeKey, result: &ProbeResult, elapsed: Duration) {
        let level = if result.is_success() { LogLevel::Debug } else { LogLevel::Info };
        self.logger.log(level, &format!("Probe {} completed", key))
            .result_info(key, result)
            .field("elapsed_ms", elapsed.as_secs_f64() * 1000.0)
            .log()
            .await;
    }

    pub async fn restricted(&self, country_code: &str, terminated: usize) {
        self.logger.warn(&format!("Restricted region {}, terminating {} probes", country_code, terminated))
            .field("country_code", country_code)
            .field("terminated", terminated)
            .log()
            .await;
    }

    pub async fn gate_unavailable(&self, key: &ProbeKey, error: &AppError) {
        self.logger.error(&format!("Gate probe {} could not be attempted: {}", key, error))
            .field("probe", key.as_str())
            .error_info(error)
            .log()
            .await;
    }

    pub async fn wave_fired(&self, wave: &str, trigger: &ProbeKey, size: usize) {
        self.logger.info(&format!("Wave '{}' fired by {}", wave, trigger))
            .field("wave", wave)
            .field("trigger", trigger.as_str())
            .field("size", size)
            .log()
            .await;
    }

    pub async fn factory_failed(&self, key: &ProbeKey, error: &AppError) {
        self.logger.warn(&format!("Probe {} could not be built: {}", key, error))
            .field("probe", key.as_str())
            .error_info(error)
            .log()
            .await;
    }

    pub async fn sink_failed(&self, key: &ProbeKey, error: &AppError) {
        self.logger.warn(&format!("Result sink failed for {}: {}", key, error))
            .field("probe", key.as_str())
            .error_info(error)
            .log()
            .await;
    }

    pub async fn cancelling(&self, reason: &str, in_flight: usize) {
        self.logger.warn(&format!("Cancelling {} in-flight probes: {}", in_flight, reason))
            .field("reason", reason)
            .field("in_flight", in_flight)
            .log()
            .await;
    }

    pub async fn aborted_after_grace(&self, in_flight: usize, grace: Duration) {
        self.logger.warn(&format!("Probes still running {}ms after cancellation, aborting", grace.as_millis()))
            .field("in_flight", in_flight)
            .field("grace_ms", grace.as_millis() as u64)
            .log()
            .await;
    }

    /// Log a fatal run error and stop correlating entries with the run
    pub async fn run_failed(&self, error: &AppError, elapsed: Duration) {
        self.logger.error(&format!("Run failed: {}", error))
            .error_info(error)
            .field("elapsed_ms", elapsed.as_secs_f64() * 1000.0)
            .log()
            .await;
        self.logger.clear_run_id().await;
    }

    /// Log the terminal state and stop correlating entries with the run
    pub async fn run_finished(&self, status: RunStatus, delivered: usize, elapsed: Duration) {
        self.logger.info(&format!("Run finished: {:?}, {} results in {:.1}ms",
            status, delivered, elapsed.as_secs_f64() * 1000.0))
            .field("status", status)
            .field("delivered", delivered)
            .field("elapsed_ms", elapsed.as_secs_f64() * 1000.0)
            .log()
            .await;
        self.logger.clear_run_id().await;
    }
}

//! Error handling for the network status checker

use thiserror::Error;

/// Custom error types for the network status checker
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors (bad status, unreadable body)
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, page scraping)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Scheduler invariant violations; fatal to a run
    #[error("Orchestration error: {0}")]
    Orchestration(String),

    /// Result sink failures; logged, never fatal
    #[error("Result sink error: {0}")]
    Sink(String),

    /// Work abandoned because its run was cancelled
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new orchestration error
    pub fn orchestration<S: Into<String>>(message: S) -> Self {
        Self::Orchestration(message.into())
    }

    /// Create a new sink error
    pub fn sink<S: Into<String>>(message: S) -> Self {
        Self::Sink(message.into())
    }

    /// Create a new cancellation error
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Orchestration(_) => "ORCHESTRATION",
            Self::Sink(_) => "SINK",
            Self::Cancelled(_) => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (a later run may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) | Self::Sink(_) => true,
            Self::Cancelled(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Io(_) | Self::Orchestration(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Network(msg) => {
                format!("Network connectivity issue: {}\n\nSuggestion: Check your internet connection and try again.", msg)
            }
            Self::HttpRequest(msg) => {
                format!("HTTP request failed: {}\n\nSuggestion: The probed service may be down or blocking requests from your network.", msg)
            }
            Self::Timeout(msg) => {
                format!("Request timed out: {}\n\nSuggestion: Increase the probe timeout using --timeout-ms or check your network connection.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the format of your URLs, country codes, or other configuration values.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: The probed service may have changed its response format.", msg)
            }
            Self::Orchestration(msg) => {
                format!("Probe scheduling failed: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
            Self::Sink(msg) => {
                format!("Could not display a result: {}\n\nSuggestion: Check that the output stream is still open.", msg)
            }
            Self::Cancelled(msg) => {
                format!("Run cancelled: {}\n\nSuggestion: Run the check again to get a complete report.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::HttpRequest(_) => 2,  // Network issues
            Self::Timeout(_) => 3,  // Timeout issues
            Self::Io(_) | Self::Sink(_) => 5,  // I/O issues
            Self::Orchestration(_) => 6,  // Scheduler defects
            Self::Cancelled(_) => 130,  // Interrupted
            Self::Internal(_) => 99,  // Internal/unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::HttpRequest(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) | Self::Cancelled(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::Sink(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Orchestration(_) | Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else if error.is_decode() {
            Self::parse(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            Self::cancelled(format!("task {} aborted", error.id()))
        } else {
            Self::orchestration(format!("task {} panicked", error.id()))
        }
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        // Keep the original variant so probe classification still sees timeouts
        self.map_err(|e| match e.into() {
            AppError::Timeout(msg) => AppError::timeout(format!("{}: {}", f(), msg)),
            AppError::Network(msg) => AppError::network(format!("{}: {}", f(), msg)),
            AppError::HttpRequest(msg) => AppError::http_request(format!("{}: {}", f(), msg)),
            AppError::Parse(msg) => AppError::parse(format!("{}: {}", f(), msg)),
            other => AppError::internal(format!("{}: {}", f(), other)),
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let network_error = AppError::network("Connection failed");
        assert_eq!(network_error.category(), "NETWORK");
        assert!(network_error.is_recoverable());
        assert_eq!(network_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::orchestration("key netflix launched twice");
        let display = error.to_string();
        assert!(display.contains("Orchestration error"));
        assert!(display.contains("launched twice"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::network("network"),
            AppError::http_request("http"),
            AppError::timeout("timeout"),
            AppError::validation("validation"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::orchestration("orchestration"),
            AppError::sink("sink"),
            AppError::cancelled("cancelled"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "NETWORK", "HTTP", "TIMEOUT", "VALIDATION", "IO",
            "PARSE", "ORCHESTRATION", "SINK", "CANCELLED", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::network("test").is_recoverable());
        assert!(AppError::timeout("test").is_recoverable());
        assert!(AppError::sink("test").is_recoverable());

        assert!(!AppError::config("test").is_recoverable());
        assert!(!AppError::orchestration("test").is_recoverable());
        assert!(!AppError::parse("test").is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::network("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::orchestration("test").exit_code(), 6);
        assert_eq!(AppError::cancelled("test").exit_code(), 130);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_user_friendly_messages() {
        let error = AppError::timeout("ip_info after 3000ms");
        let message = error.user_friendly_message();
        assert!(message.contains("Request timed out"));
        assert!(message.contains("--timeout-ms"));
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<u64>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app_error: AppError = json_error.into();
        assert!(app_error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_context_preserves_timeout_variant() {
        let result: Result<()> = Err(AppError::timeout("deadline elapsed"));
        let error = result.context("fetching foreign IP").unwrap_err();
        assert_eq!(error.category(), "TIMEOUT");
        assert!(error.to_string().contains("fetching foreign IP"));
    }

    #[test]
    fn test_context_wraps_other_errors_as_internal() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        let error = result.with_context(|| "While reading .env".to_string()).unwrap_err();
        assert_eq!(error.category(), "INTERNAL");
        assert!(error.to_string().contains("While reading .env"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::sink("stdout closed");
        let plain = error.format_for_console(false);
        assert_eq!(plain, "[SINK] Result sink error: stdout closed");
        assert!(error.format_for_console(true).contains("SINK"));
    }

    #[tokio::test]
    async fn test_join_error_conversion() {
        let handle = tokio::spawn(async {
            panic!("probe exploded");
        });
        let join_error = handle.await.unwrap_err();
        let app_error: AppError = join_error.into();
        assert_eq!(app_error.category(), "ORCHESTRATION");

        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let app_error: AppError = handle.await.unwrap_err().into();
        assert_eq!(app_error.category(), "CANCELLED");
    }

    #[test]
    fn test_anyhow_integration() {
        let app_error: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(app_error.category(), "INTERNAL");
    }
}

//! Configuration validation beyond hard errors
//!
//! `Config::validate` rejects settings that cannot work; the checks here
//! flag settings that work but are probably not what the user wanted.

use crate::{
    error::Result,
    models::{Config, FreedomReport},
};
use colored::*;

/// Configuration validator producing advisory warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Hard validation first, then advisory checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_endpoints(config));
        warnings.extend(Self::validate_timeouts(config));
        warnings.extend(Self::validate_policy(config));
        Ok(warnings)
    }

    fn validate_endpoints(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, url) in config.endpoints.named() {
            let parsed = match url::Url::parse(url) {
                Ok(parsed) => parsed,
                Err(_) => continue,
            };
            let local = matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "::1" | "[::1]"));
            if local {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("{} points at a local address ({})", name, url),
                ));
            } else if parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("{} uses plain HTTP; responses may be tampered with", name),
                ));
            }
        }

        warnings
    }

    fn validate_timeouts(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.probe_timeout_ms < 500 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Probe timeout of {}ms will fail most checks on slow links", config.probe_timeout_ms),
            ));
        } else if config.probe_timeout_ms > 10_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long probe timeout of {}ms will slow down failure detection", config.probe_timeout_ms),
            ));
        }

        if config.gate_timeout_ms < config.probe_timeout_ms {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Gate timeout is shorter than the probe timeout although the IP lookup chains several requests"
                    .to_string(),
            ));
        }

        let critical_path = config.gate_timeout() + config.probe_timeout();
        if config.overall_timeout() < critical_path {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Overall timeout of {}s is shorter than gate plus probe timeout ({}ms); slow runs will be cut off",
                    config.overall_timeout_seconds,
                    critical_path.as_millis()
                ),
            ));
        }

        if config.sink_timeout() > config.overall_timeout() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Sink timeout exceeds the overall timeout and will never trigger".to_string(),
            ));
        }

        if config.grace_period_ms > 5_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Grace period of {}ms delays shutdown after cancellation", config.grace_period_ms),
            ));
        }

        warnings
    }

    fn validate_policy(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.restricted_countries.is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "No restricted countries configured; every check always runs".to_string(),
            ));
        }

        if config.enable_streaming && config.endpoints.freedom_urls.len() < FreedomReport::FREE_THRESHOLD {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Only {} freedom URL(s) configured but {} must be reachable; streaming checks will never run",
                    config.endpoints.freedom_urls.len(),
                    FreedomReport::FREE_THRESHOLD
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            format!("[{}] {}", self.level.as_str().color(self.level.color()).bold(), self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

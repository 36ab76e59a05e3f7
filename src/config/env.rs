//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if it exists
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load an env file; variables already set in the process keep their values.
    ///
    /// Returns whether the file existed.
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        let mut content = String::from(
            "# Network Status Checker Configuration\n\
             #\n\
             # Values here are used unless the same variable is already set in the\n\
             # environment; command-line flags override both.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content.push_str(
            "# Pointing every check at a local mock server:\n\
             # DOMESTIC_IP_URL=http://127.0.0.1:8080/domestic-ip\n\
             # FOREIGN_IP_URL=http://127.0.0.1:8080/foreign-ip\n\
             # GEO_LOOKUP_URL=http://127.0.0.1:8080/geo\n",
        );
        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let number = |min: u64, max: u64| -> Result<()> {
            let parsed: u64 = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            if parsed < min || parsed > max {
                return Err(AppError::config(format!(
                    "{} must be between {} and {}, got: {}", key, min, max, parsed
                )));
            }
            Ok(())
        };

        match key {
            "PROBE_TIMEOUT_MS" => number(1, 60_000)?,
            "GATE_TIMEOUT_MS" => number(1, 120_000)?,
            "OVERALL_TIMEOUT_SECONDS" => number(1, 300)?,
            "GRACE_PERIOD_MS" => number(0, 10_000)?,
            "SINK_TIMEOUT_MS" => number(1, 60_000)?,
            "RESTRICTED_COUNTRIES" => {
                for code in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                        return Err(AppError::config(format!(
                            "Invalid RESTRICTED_COUNTRIES entry '{}': expected two letters", code
                        )));
                    }
                }
            }
            "ENABLE_STREAMING" | "ENABLE_COLOR" => {
                value
                    .trim()
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "FREEDOM_URLS" => {
                for url in value.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                    Self::validate_url(key, url)?;
                }
            }
            key if key.ends_with("_URL") => Self::validate_url(key, value.trim())?,
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    fn validate_url(key: &str, url: &str) -> Result<()> {
        let parsed = url::Url::parse(url)
            .map_err(|e| AppError::config(format!("Invalid {} entry '{}': {}", key, url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::config(format!("{} must use http or https: {}", key, url)));
        }
        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROBE_TIMEOUT_MS", "Per-probe timeout in milliseconds (1-60000)", "3000"),
            ("GATE_TIMEOUT_MS", "Timeout of the IP lookup in milliseconds", "5000"),
            ("OVERALL_TIMEOUT_SECONDS", "Ceiling for a whole run in seconds (1-300)", "30"),
            ("GRACE_PERIOD_MS", "Time cancelled probes get before being aborted", "500"),
            ("SINK_TIMEOUT_MS", "Upper bound for printing one result", "2000"),
            ("RESTRICTED_COUNTRIES", "Country codes where probing stops", "CU,IR,KP,SY"),
            ("ENABLE_STREAMING", "Run the streaming checks on a free network", "true"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("DOMESTIC_IP_URL", "Plain-text IP echo reached via domestic routes", crate::defaults::endpoints::DOMESTIC_IP_URL),
            ("FOREIGN_IP_URL", "Plain-text IP echo reached via foreign routes", crate::defaults::endpoints::FOREIGN_IP_URL),
            ("GEO_LOOKUP_URL", "Geo lookup base; the IP is appended", crate::defaults::endpoints::GEO_LOOKUP_URL),
            ("FREEDOM_URLS", "Comma-separated sites usually blocked by censorship", "https://www.youtube.com/generate_204"),
            ("GOOGLE_URL", "Google homepage used for region detection", crate::defaults::endpoints::GOOGLE_URL),
            ("GITHUB_URL", "Host timed by the GitHub speed check", crate::defaults::endpoints::GITHUB_URL),
            ("ACADEMIC_LOGIN_URL", "CNKI IP login endpoint", crate::defaults::endpoints::ACADEMIC_LOGIN_URL),
            ("NETFLIX_TITLE_URL", "A licensed Netflix title page", crate::defaults::endpoints::NETFLIX_TITLE_URL),
            ("NETFLIX_ORIGINAL_URL", "A Netflix original title page", crate::defaults::endpoints::NETFLIX_ORIGINAL_URL),
            ("DISNEY_PLUS_URL", "Disney+ homepage", crate::defaults::endpoints::DISNEY_PLUS_URL),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<24} {}\n", var, description));
            help.push_str(&format!("  {:<24} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var, _, _)| {
                let value = std::env::var(var).ok()?;
                Self::validate_env_var(var, &value).err().map(|e| format!("Warning: {}", e))
            })
            .collect()
    }

    /// Validate the contents of an env file without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => {
                    if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                        warnings.push(format!("Line '{}': {}", line, e));
                    }
                }
                None => warnings.push(format!("Line '{}': expected KEY=VALUE", line)),
            }
        }

        Ok(Some(warnings))
    }
}

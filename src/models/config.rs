//! Configuration data model and validation

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// URLs hit by the concrete probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Returns the address seen by domestic websites as plain text
    pub domestic_ip_url: String,
    /// Returns the address seen by foreign websites as plain text
    pub foreign_ip_url: String,
    /// Geo lookup base; the IP is appended as a path segment
    pub geo_lookup_url: String,
    /// Sites that are typically unreachable from a censored network
    pub freedom_urls: Vec<String>,
    pub google_url: String,
    pub github_url: String,
    pub academic_login_url: String,
    /// A licensed (non-original) title page
    pub netflix_title_url: String,
    /// A Netflix original title page
    pub netflix_original_url: String,
    pub disney_plus_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        use crate::defaults::endpoints as d;
        Self {
            domestic_ip_url: d::DOMESTIC_IP_URL.to_string(),
            foreign_ip_url: d::FOREIGN_IP_URL.to_string(),
            geo_lookup_url: d::GEO_LOOKUP_URL.to_string(),
            freedom_urls: d::FREEDOM_URLS.iter().map(|&s| s.to_string()).collect(),
            google_url: d::GOOGLE_URL.to_string(),
            github_url: d::GITHUB_URL.to_string(),
            academic_login_url: d::ACADEMIC_LOGIN_URL.to_string(),
            netflix_title_url: d::NETFLIX_TITLE_URL.to_string(),
            netflix_original_url: d::NETFLIX_ORIGINAL_URL.to_string(),
            disney_plus_url: d::DISNEY_PLUS_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at one base URL (used against mock servers)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            domestic_ip_url: format!("{}/domestic-ip", base),
            foreign_ip_url: format!("{}/foreign-ip", base),
            geo_lookup_url: format!("{}/geo", base),
            freedom_urls: vec![
                format!("{}/freedom/1", base),
                format!("{}/freedom/2", base),
                format!("{}/freedom/3", base),
            ],
            google_url: format!("{}/google", base),
            github_url: format!("{}/github", base),
            academic_login_url: format!("{}/academic", base),
            netflix_title_url: format!("{}/netflix/title", base),
            netflix_original_url: format!("{}/netflix/original", base),
            disney_plus_url: format!("{}/disney", base),
        }
    }

    /// All endpoints with the environment variable that overrides each
    pub fn named(&self) -> Vec<(&'static str, &str)> {
        let mut named = vec![
            ("DOMESTIC_IP_URL", self.domestic_ip_url.as_str()),
            ("FOREIGN_IP_URL", self.foreign_ip_url.as_str()),
            ("GEO_LOOKUP_URL", self.geo_lookup_url.as_str()),
            ("GOOGLE_URL", self.google_url.as_str()),
            ("GITHUB_URL", self.github_url.as_str()),
            ("ACADEMIC_LOGIN_URL", self.academic_login_url.as_str()),
            ("NETFLIX_TITLE_URL", self.netflix_title_url.as_str()),
            ("NETFLIX_ORIGINAL_URL", self.netflix_original_url.as_str()),
            ("DISNEY_PLUS_URL", self.disney_plus_url.as_str()),
        ];
        named.extend(self.freedom_urls.iter().map(|url| ("FREEDOM_URLS", url.as_str())));
        named
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-probe timeout
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Timeout of the gate (IP / region) probe, which chains several requests
    #[serde(default = "default_gate_timeout_ms")]
    pub gate_timeout_ms: u64,

    /// Ceiling for a whole run
    #[serde(default = "default_overall_timeout_secs")]
    pub overall_timeout_seconds: u64,

    /// How long cancelled probes get to acknowledge before being aborted
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Upper bound for a single sink delivery
    #[serde(default = "default_sink_timeout_ms")]
    pub sink_timeout_ms: u64,

    /// ISO country codes where probing stops after the gate
    #[serde(default = "default_restricted_countries")]
    pub restricted_countries: Vec<String>,

    /// Launch the streaming wave when the network is free
    #[serde(default = "default_enable_streaming")]
    pub enable_streaming: bool,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Print addresses unmasked
    #[serde(default)]
    pub show_full_ip: bool,

    /// Dump the final outcome as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            gate_timeout_ms: default_gate_timeout_ms(),
            overall_timeout_seconds: default_overall_timeout_secs(),
            grace_period_ms: default_grace_period_ms(),
            sink_timeout_ms: default_sink_timeout_ms(),
            restricted_countries: default_restricted_countries(),
            enable_streaming: default_enable_streaming(),
            endpoints: Endpoints::default(),
            show_full_ip: false,
            json_output: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_seconds)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    /// Case-insensitive membership in the restricted country list
    pub fn is_restricted_country(&self, country_code: &str) -> bool {
        self.restricted_countries
            .iter()
            .any(|code| code.eq_ignore_ascii_case(country_code))
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        for (name, url) in self.endpoints.named() {
            if url.is_empty() {
                return Err(AppError::config(format!("{} cannot be empty", name)));
            }
            match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(parsed) => {
                    return Err(AppError::config(format!(
                        "{} must use http or https, got '{}'", name, parsed.scheme()
                    )));
                }
                Err(e) => {
                    return Err(AppError::config(format!("Invalid {} '{}': {}", name, url, e)));
                }
            }
        }

        if self.endpoints.freedom_urls.is_empty() {
            return Err(AppError::config("At least one freedom URL is required"));
        }

        for code in &self.restricted_countries {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(AppError::config(format!(
                    "Invalid country code '{}': expected two ASCII letters", code
                )));
            }
        }

        if self.probe_timeout_ms == 0 {
            return Err(AppError::config("Probe timeout must be greater than 0"));
        }

        if self.probe_timeout_ms > 60_000 {
            return Err(AppError::config("Probe timeout cannot exceed 60000 ms"));
        }

        if self.gate_timeout_ms == 0 {
            return Err(AppError::config("Gate timeout must be greater than 0"));
        }

        if self.overall_timeout_seconds == 0 {
            return Err(AppError::config("Overall timeout must be greater than 0"));
        }

        if self.overall_timeout_seconds > 300 {
            return Err(AppError::config("Overall timeout cannot exceed 300 seconds"));
        }

        if self.sink_timeout_ms == 0 {
            return Err(AppError::config("Sink timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge settings from an arbitrary key lookup (environment, tests)
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            value.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
        }

        fn list(value: &str) -> Vec<String> {
            value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }

        if let Some(value) = lookup("PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = number("PROBE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("GATE_TIMEOUT_MS") {
            self.gate_timeout_ms = number("GATE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("OVERALL_TIMEOUT_SECONDS") {
            self.overall_timeout_seconds = number("OVERALL_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = lookup("GRACE_PERIOD_MS") {
            self.grace_period_ms = number("GRACE_PERIOD_MS", &value)?;
        }
        if let Some(value) = lookup("SINK_TIMEOUT_MS") {
            self.sink_timeout_ms = number("SINK_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("RESTRICTED_COUNTRIES") {
            self.restricted_countries = list(&value)
                .into_iter()
                .map(|code| code.to_ascii_uppercase())
                .collect();
        }
        if let Some(value) = lookup("ENABLE_STREAMING") {
            self.enable_streaming = number("ENABLE_STREAMING", &value)?;
        }
        if let Some(value) = lookup("ENABLE_COLOR") {
            self.enable_color = number("ENABLE_COLOR", &value)?;
        }

        let endpoints = &mut self.endpoints;
        for (key, slot) in [
            ("DOMESTIC_IP_URL", &mut endpoints.domestic_ip_url),
            ("FOREIGN_IP_URL", &mut endpoints.foreign_ip_url),
            ("GEO_LOOKUP_URL", &mut endpoints.geo_lookup_url),
            ("GOOGLE_URL", &mut endpoints.google_url),
            ("GITHUB_URL", &mut endpoints.github_url),
            ("ACADEMIC_LOGIN_URL", &mut endpoints.academic_login_url),
            ("NETFLIX_TITLE_URL", &mut endpoints.netflix_title_url),
            ("NETFLIX_ORIGINAL_URL", &mut endpoints.netflix_original_url),
            ("DISNEY_PLUS_URL", &mut endpoints.disney_plus_url),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value.trim().to_string();
            }
        }
        if let Some(value) = lookup("FREEDOM_URLS") {
            endpoints.freedom_urls = list(&value);
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_probe_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_gate_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_GATE_TIMEOUT.as_millis() as u64
}

fn default_overall_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_OVERALL_TIMEOUT.as_secs()
}

fn default_grace_period_ms() -> u64 {
    crate::defaults::DEFAULT_GRACE_PERIOD.as_millis() as u64
}

fn default_sink_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_SINK_TIMEOUT.as_millis() as u64
}

fn default_restricted_countries() -> Vec<String> {
    crate::defaults::DEFAULT_RESTRICTED_COUNTRIES
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_enable_streaming() -> bool {
    true
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mock_base_endpoints_are_valid() {
        let config = Config {
            endpoints: Endpoints::with_base("http://127.0.0.1:9999/"),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoints.google_url, "http://127.0.0.1:9999/google");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = Config::default();
        config.endpoints.google_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.endpoints.github_url = "ftp://example.com".to_string();
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("GITHUB_URL"));
    }

    #[test]
    fn test_invalid_country_code_rejected() {
        let mut config = Config::default();
        config.restricted_countries = vec!["PRK".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_probe_timeout_invalid() {
        let mut config = Config::default();
        config.probe_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_restricted_country_is_case_insensitive() {
        let mut config = Config::default();
        config.restricted_countries = vec!["KP".to_string()];
        assert!(config.is_restricted_country("kp"));
        assert!(!config.is_restricted_country("JP"));
    }

    #[test]
    fn test_merge_from_lookup() {
        let mut config = Config::default();
        config
            .merge_from_lookup(lookup_from(&[
                ("PROBE_TIMEOUT_MS", "1500"),
                ("RESTRICTED_COUNTRIES", "kp, ir ,"),
                ("ENABLE_STREAMING", "false"),
                ("FREEDOM_URLS", "https://a.example/204,https://b.example/204"),
                ("GOOGLE_URL", " https://www.google.com.hk "),
            ]))
            .unwrap();

        assert_eq!(config.probe_timeout(), Duration::from_millis(1500));
        assert_eq!(config.restricted_countries, vec!["KP", "IR"]);
        assert!(!config.enable_streaming);
        assert_eq!(config.endpoints.freedom_urls.len(), 2);
        assert_eq!(config.endpoints.google_url, "https://www.google.com.hk");
    }

    #[test]
    fn test_merge_rejects_bad_numbers() {
        let mut config = Config::default();
        let error = config
            .merge_from_lookup(lookup_from(&[("OVERALL_TIMEOUT_SECONDS", "soon")]))
            .unwrap_err();
        assert_eq!(error.category(), "CONFIG");
        assert!(error.to_string().contains("OVERALL_TIMEOUT_SECONDS"));
    }
}

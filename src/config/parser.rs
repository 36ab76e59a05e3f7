//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{supports_color, Cli},
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Defaults, then `.env`, then the process environment, then flags
    pub fn parse(&self) -> Result<Config> {
        let loaded = EnvManager::load_env_file()?;
        if self.cli.debug {
            if loaded {
                eprintln!("Loaded configuration from .env file");
            } else {
                eprintln!("No .env file found, using defaults, environment and CLI arguments");
            }
        }

        self.parse_with_lookup(|key| std::env::var(key).ok())
    }

    /// Same layering with an explicit environment, skipping `.env`
    pub fn parse_with_lookup<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.merge_from_lookup(lookup)?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(ms) = cli.timeout_ms {
            config.probe_timeout_ms = ms;
        }
        if let Some(secs) = cli.overall_timeout {
            config.overall_timeout_seconds = secs;
        }
        if let Some(codes) = cli.restricted_countries() {
            config.restricted_countries = codes;
        }
        if cli.no_streaming {
            config.enable_streaming = false;
        }
        if cli.show_full_ip {
            config.show_full_ip = true;
        }

        config.json_output = cli.json;
        config.enable_color = if cli.color {
            true
        } else if cli.no_color || cli.json {
            false
        } else {
            config.enable_color && supports_color()
        };

        // CLI-only
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Configuration summary for debug output
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = vec![
        format!("Probe Timeout: {}ms", config.probe_timeout_ms),
        format!("Gate Timeout: {}ms", config.gate_timeout_ms),
        format!("Overall Timeout: {}s", config.overall_timeout_seconds),
        format!("Grace Period: {}ms", config.grace_period_ms),
        format!("Sink Timeout: {}ms", config.sink_timeout_ms),
        format!("Restricted Countries: {}", config.restricted_countries.join(", ")),
        format!("Streaming Checks: {}", config.enable_streaming),
        format!("Color Output: {}", config.enable_color),
        format!("JSON Output: {}", config.json_output),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ];
    summary.extend(
        config
            .endpoints
            .named()
            .into_iter()
            .map(|(name, url)| format!("{}: {}", name, url)),
    );

    summary.join("\n")
}

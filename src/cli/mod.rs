//! Command-line interface module with topic help

pub mod help;

pub use help::HelpSystem;

use clap::Parser;
use std::path::PathBuf;

/// Network Status Checker - streams reachability, region and speed checks as they finish
#[derive(Parser, Debug, Clone)]
#[command(name = "nsc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Per-probe timeout in milliseconds
    #[arg(short, long = "timeout-ms", value_name = "MS", value_parser = parse_millis)]
    pub timeout_ms: Option<u64>,

    /// Ceiling for the whole run in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_duration)]
    pub overall_timeout: Option<u64>,

    /// Country codes where probing stops after the IP lookup (comma-separated)
    #[arg(long, value_name = "CODES")]
    pub restricted: Option<String>,

    /// Skip the streaming service checks
    #[arg(long)]
    pub no_streaming: bool,

    /// Print IP addresses unmasked
    #[arg(long)]
    pub show_full_ip: bool,

    /// Print the final outcome as JSON instead of streaming lines
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Show help for specific topic (config, env, probes, examples, output)
    #[arg(long, value_name = "TOPIC")]
    pub help_topic: Option<String>,

    /// Write an example .env file to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_env_example: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.json && self.verbose {
            return Err("--verbose has no effect with --json; pick one".to_string());
        }

        if let Some(codes) = self.restricted_countries() {
            for code in codes {
                if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(format!("Invalid country code '{}' in --restricted", code));
                }
            }
        }

        Ok(())
    }

    /// Country codes from `--restricted`, upper-cased; empty entries dropped
    pub fn restricted_countries(&self) -> Option<Vec<String>> {
        self.restricted.as_ref().map(|raw| {
            raw.split(',')
                .map(|code| code.trim().to_uppercase())
                .filter(|code| !code.is_empty())
                .collect()
        })
    }

    /// Check if help should be displayed for a specific topic
    pub fn should_show_topic_help(&self) -> bool {
        self.help_topic.is_some()
    }

    pub fn get_help_topic(&self) -> Option<&str> {
        self.help_topic.as_deref()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }

    /// Display help for the specified topic or main help
    pub fn display_help(&self) -> String {
        let help_system = HelpSystem::new();
        let use_colors = self.use_colors();

        if let Some(topic) = &self.help_topic {
            help_system.display_topic_help(topic, use_colors).unwrap_or_else(|| {
                format!(
                    "Unknown help topic: '{}'\n\nAvailable topics: {}\n\n{}",
                    topic,
                    help::TOPICS.join(", "),
                    help_system.display_main_help(use_colors)
                )
            })
        } else {
            help_system.display_main_help(use_colors)
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command Line:\n");
        if let Some(ms) = self.timeout_ms {
            summary.push_str(&format!("  Probe timeout: {}ms\n", ms));
        }
        if let Some(secs) = self.overall_timeout {
            summary.push_str(&format!("  Overall timeout: {}s\n", secs));
        }
        if let Some(codes) = self.restricted_countries() {
            summary.push_str(&format!("  Restricted countries: {}\n", codes.join(", ")));
        }
        summary.push_str(&format!("  Streaming checks: {}\n", !self.no_streaming));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  JSON output: {}\n", self.json));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Parse a probe timeout in milliseconds, 1..=60000
fn parse_millis(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid timeout: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid timeout: {}", s))
        .and_then(|ms| match ms {
            0 => Err("Timeout must be greater than 0".to_string()),
            ms if ms > 60_000 => Err("Timeout cannot exceed 60000 ms".to_string()),
            ms => Ok(ms),
        })
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 300 {
                Err("Duration cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

//! Command-line help with topics and usage examples

use crate::config::env::EnvManager;
use colored::*;

/// Topics accepted by `--help-topic`
pub const TOPICS: &[&str] = &["config", "env", "probes", "examples", "output"];

/// Help text renderer for the CLI
pub struct HelpSystem {
    platform: String,
}

impl HelpSystem {
    pub fn new() -> Self {
        Self {
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }

    /// Display the main help message with all available options
    pub fn display_main_help(&self, use_colors: bool) -> String {
        let mut help = String::new();

        help.push_str(&self.format_header(use_colors));
        help.push('\n');
        help.push_str(&self.format_usage_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_options_section(use_colors));
        help.push('\n');
        help.push_str(&self.format_examples_section(use_colors));
        help.push('\n');
        help.push_str(&format!(
            "Run with --help-topic <TOPIC> for details. Topics: {}\n",
            TOPICS.join(", ")
        ));

        help
    }

    /// Display help for a single topic
    pub fn display_topic_help(&self, topic: &str, use_colors: bool) -> Option<String> {
        match topic.to_lowercase().as_str() {
            "config" | "configuration" => Some(self.format_configuration_help(use_colors)),
            "env" | "environment" => Some(self.format_environment_help(use_colors)),
            "probes" | "checks" => Some(self.format_probes_help(use_colors)),
            "examples" => Some(self.format_examples_section(use_colors)),
            "output" | "formatting" => Some(self.format_output_help(use_colors)),
            _ => None,
        }
    }

    fn section(title: &str, use_colors: bool) -> String {
        if use_colors {
            title.bright_green().bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn format_header(&self, use_colors: bool) -> String {
        let title = "Network Status Checker";
        let subtitle = "Streams IP, reachability, region and speed checks as each one finishes";
        let version = crate::VERSION;

        if use_colors {
            format!(
                "{}\n{}\nVersion: {} | Platform: {}\n",
                title.bright_cyan().bold(),
                subtitle.bright_blue(),
                version.green(),
                self.platform.yellow()
            )
        } else {
            format!("{}\n{}\nVersion: {} | Platform: {}\n", title, subtitle, version, self.platform)
        }
    }

    fn format_usage_section(&self, use_colors: bool) -> String {
        let mut usage = format!("{}\n", Self::section("USAGE:", use_colors));
        for pattern in ["nsc [OPTIONS]", "nsc --json [OPTIONS]", "nsc --help-topic <TOPIC>"] {
            if use_colors {
                usage.push_str(&format!("  {}\n", pattern.bright_white()));
            } else {
                usage.push_str(&format!("  {}\n", pattern));
            }
        }
        usage
    }

    fn format_options_section(&self, use_colors: bool) -> String {
        let options = [
            OptionHelp {
                short: Some("t"),
                long: "timeout-ms",
                value: "<MS>",
                description: "Per-probe timeout (1-60000)",
                example: Some("nsc -t 1500"),
            },
            OptionHelp {
                short: None,
                long: "overall-timeout",
                value: "<SECS>",
                description: "Ceiling for the whole run (1-300)",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "restricted",
                value: "<CODES>",
                description: "Countries where probing stops after the IP lookup",
                example: Some("nsc --restricted KP,IR"),
            },
            OptionHelp {
                short: None,
                long: "no-streaming",
                value: "",
                description: "Skip the Netflix and Disney+ checks",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "show-full-ip",
                value: "",
                description: "Print addresses unmasked",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "json",
                value: "",
                description: "Print the final outcome as JSON",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "color / --no-color",
                value: "",
                description: "Force or disable colored output",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "verbose / --debug",
                value: "",
                description: "Log orchestration events to stderr",
                example: None,
            },
            OptionHelp {
                short: None,
                long: "write-env-example",
                value: "<PATH>",
                description: "Write a commented .env template and exit",
                example: Some("nsc --write-env-example .env.example"),
            },
        ];

        let mut section = format!("{}\n", Self::section("OPTIONS:", use_colors));
        for option in &options {
            section.push_str(&option.format(use_colors));
            section.push('\n');
        }
        section
    }

    fn format_examples_section(&self, use_colors: bool) -> String {
        let examples = [
            ExampleHelp {
                title: "Standard run",
                command: "nsc",
                description: "IP lookup first, then the basic checks, streaming when the network is free",
            },
            ExampleHelp {
                title: "Fast and strict",
                command: "nsc --timeout-ms 800 --overall-timeout 5",
                description: "Give up on slow sites quickly",
            },
            ExampleHelp {
                title: "Script friendly",
                command: "nsc --json --no-streaming | jq .status",
                description: "One JSON document with every recorded result",
            },
        ];

        let mut section = format!("{}\n", Self::section("EXAMPLES:", use_colors));
        for example in &examples {
            section.push_str(&example.format(use_colors));
        }
        section
    }

    fn format_configuration_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n", Self::section("CONFIGURATION:", use_colors));
        help.push_str("Settings are layered, later sources winning:\n");
        help.push_str("  1. Built-in defaults\n");
        help.push_str("  2. A .env file in the working directory\n");
        help.push_str("  3. Process environment variables\n");
        help.push_str("  4. Command-line flags\n\n");
        help.push_str("Timeouts:\n");
        help.push_str("  PROBE_TIMEOUT_MS        each check after the IP lookup\n");
        help.push_str("  GATE_TIMEOUT_MS         the IP lookup, which chains several requests\n");
        help.push_str("  OVERALL_TIMEOUT_SECONDS the whole run; unfinished checks are cancelled\n");
        help.push_str("  GRACE_PERIOD_MS         how long cancelled checks get before being aborted\n");
        help.push_str("  SINK_TIMEOUT_MS         how long printing one result may take\n");
        help
    }

    fn format_environment_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n", Self::section("ENVIRONMENT VARIABLES:", use_colors));
        for (name, description, _) in EnvManager::get_supported_env_vars() {
            if use_colors {
                help.push_str(&format!("  {:<26} {}\n", name.bright_cyan(), description));
            } else {
                help.push_str(&format!("  {:<26} {}\n", name, description));
            }
        }
        help
    }

    fn format_probes_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n", Self::section("CHECKS:", use_colors));
        help.push_str("  ip_info         domestic and foreign exit IPs with their regions (runs first)\n");
        help.push_str("  network_status  whether commonly blocked sites are reachable\n");
        help.push_str("  google_region   the region Google assigns to this network\n");
        help.push_str("  github_speed    round trip to raw.githubusercontent.com\n");
        help.push_str("  academic_name   institution name from the CNKI IP login\n");
        help.push_str("  netflix         catalogue access (only when the network is free)\n");
        help.push_str("  disney_plus     service availability (only when the network is free)\n\n");
        help.push_str("When ip_info reports a restricted country every other check is skipped.\n");
        help
    }

    fn format_output_help(&self, use_colors: bool) -> String {
        let mut help = format!("{}\n", Self::section("OUTPUT:", use_colors));
        help.push_str("Each result is printed the moment its check finishes, so the order\n");
        help.push_str("follows completion time rather than the list above.\n\n");
        help.push_str("Latency colors:\n");
        help.push_str("  green < 50ms, cyan < 100ms, yellow < 300ms, magenta < 1000ms, red above\n\n");
        help.push_str("IP addresses are masked to their first two segments unless --show-full-ip is set.\n");
        help.push_str("--json prints nothing while running and one document at the end.\n");
        help
    }
}

impl Default for HelpSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for formatting individual options
struct OptionHelp {
    short: Option<&'static str>,
    long: &'static str,
    value: &'static str,
    description: &'static str,
    example: Option<&'static str>,
}

impl OptionHelp {
    fn format(&self, use_colors: bool) -> String {
        let mut option_str = String::new();

        if let Some(short) = self.short {
            if use_colors {
                option_str.push_str(&format!("  {}, ", format!("-{}", short).bright_cyan()));
            } else {
                option_str.push_str(&format!("  -{}, ", short));
            }
        } else {
            option_str.push_str("      ");
        }

        let long_with_value = if self.value.is_empty() {
            format!("--{}", self.long)
        } else {
            format!("--{} {}", self.long, self.value)
        };

        if use_colors {
            option_str.push_str(&format!("{:<30} {}", long_with_value.bright_cyan(), self.description.white()));
        } else {
            option_str.push_str(&format!("{:<30} {}", long_with_value, self.description));
        }

        if let Some(example) = self.example {
            if use_colors {
                option_str.push_str(&format!(
                    "\n{}{}",
                    " ".repeat(36),
                    format!("Example: {}", example).bright_blue().italic()
                ));
            } else {
                option_str.push_str(&format!("\n{}Example: {}", " ".repeat(36), example));
            }
        }

        option_str
    }
}

struct ExampleHelp {
    title: &'static str,
    command: &'static str,
    description: &'static str,
}

impl ExampleHelp {
    fn format(&self, use_colors: bool) -> String {
        if use_colors {
            format!(
                "  {}:\n    {}\n    {}\n",
                self.title.bright_yellow().bold(),
                self.command.bright_white(),
                self.description.bright_blue().italic()
            )
        } else {
            format!("  {}:\n    {}\n    {}\n", self.title, self.command, self.description)
        }
    }
}

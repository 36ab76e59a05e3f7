//! Line and summary formatting for probe results

use crate::models::{IpEndpoint, IpReport, StreamingStatus};
use crate::orchestrator::RunOutcome;
use crate::types::{FailureKind, ProbeKey, ProbePayload, ProbeResult, RunStatus};
use colored::*;
use std::fmt::Write as _;

/// Formatting options
#[derive(Debug, Clone, Copy, Default)]
pub struct FormattingOptions {
    pub enable_color: bool,
    /// Print addresses unmasked
    pub show_full_ip: bool,
}

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    Excellent,  // < 50ms
    Good,       // 50-100ms
    Fair,       // 100-300ms
    Poor,       // 300-1000ms
    VeryPoor,   // > 1000ms
}

impl PerformanceLevel {
    pub fn from_latency(millis: f64) -> Self {
        if millis < 50.0 {
            Self::Excellent
        } else if millis < 100.0 {
            Self::Good
        } else if millis < 300.0 {
            Self::Fair
        } else if millis < 1000.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }
}

/// Keep the first two octets of an IPv4 address, `a.b.*.*`.
///
/// Anything else keeps its first two segments on the same separator.
pub fn mask_ip(ip: &str) -> String {
    let separator = if ip.contains('.') { '.' } else { ':' };
    let kept: Vec<&str> = ip.split(separator).take(2).collect();
    let mut masked = kept.join(&separator.to_string());
    masked.push(separator);
    masked.push('*');
    masked.push(separator);
    masked.push('*');
    masked
}

/// Human label of a probe key
pub fn label(key: &ProbeKey) -> String {
    let known = match key.as_str() {
        "ip_info" => "IP address",
        "network_status" => "Network access",
        "google_region" => "Google region",
        "github_speed" => "GitHub speed",
        "academic_name" => "Academic institution",
        "netflix" => "Netflix",
        "disney_plus" => "Disney+",
        other => return other.to_string(),
    };
    known.to_string()
}

/// Formats single results and whole outcomes
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFormatter {
    options: FormattingOptions,
}

impl ResultFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.options.enable_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn address(&self, endpoint: &IpEndpoint) -> String {
        let ip = if self.options.show_full_ip {
            endpoint.ip.clone()
        } else {
            mask_ip(&endpoint.ip)
        };
        format!("{} ({})", ip, endpoint.region)
    }

    /// Render one result; IP reports with split routing take two lines
    pub fn format_result(&self, key: &ProbeKey, result: &ProbeResult) -> String {
        let name = label(key);
        let heading = if self.options.enable_color {
            name.bold().to_string()
        } else {
            name.clone()
        };

        match result {
            ProbeResult::Success(ProbePayload::Ip(IpReport::Single { endpoint })) => {
                format!("{}: {}", heading, self.paint(&self.address(endpoint), Color::Green))
            }
            ProbeResult::Success(ProbePayload::Ip(IpReport::Split { domestic, foreign })) => {
                format!(
                    "{} (domestic sites): {}\n{} (foreign sites): {}",
                    heading,
                    self.paint(&self.address(domestic), Color::Green),
                    heading,
                    self.paint(&self.address(foreign), Color::Green)
                )
            }
            ProbeResult::Success(ProbePayload::Restricted { country_code }) => format!(
                "{}: {}",
                heading,
                self.paint(&format!("restricted region ({}), probing stopped", country_code), Color::Red)
            ),
            ProbeResult::Success(ProbePayload::Freedom(report)) => {
                let text = if report.is_free() {
                    self.paint(&format!("free ({}/{})", report.reachable, report.total), Color::Green)
                } else {
                    self.paint(&format!("restricted ({}/{})", report.reachable, report.total), Color::Yellow)
                };
                format!("{}: {}", heading, text)
            }
            ProbeResult::Success(ProbePayload::Latency { millis }) => {
                let level = PerformanceLevel::from_latency(*millis);
                format!("{}: {}", heading, self.paint(&format!("{:.2} ms", millis), level.color()))
            }
            ProbeResult::Success(ProbePayload::Streaming(report)) => {
                let color = match report.status {
                    StreamingStatus::Unlocked | StreamingStatus::Available => Color::Green,
                    StreamingStatus::OriginalsOnly => Color::Yellow,
                    StreamingStatus::Blocked => Color::Red,
                };
                format!("{}: {}", heading, self.paint(report.status.label(), color))
            }
            ProbeResult::Success(ProbePayload::Text { value }) => {
                format!("{}: {}", heading, self.paint(value, Color::Cyan))
            }
            ProbeResult::Success(ProbePayload::Empty) => {
                format!("{}: {}", heading, self.paint("not logged in", Color::BrightBlack))
            }
            ProbeResult::Failure(FailureKind::Terminated) => {
                format!("{}: {}", heading, self.paint("skipped (restricted region)", Color::BrightBlack))
            }
            ProbeResult::Failure(kind) => {
                format!("{}: {}", heading, self.paint(&kind.to_string(), Color::Red))
            }
        }
    }

    /// Render the closing summary of a run
    pub fn format_summary(&self, outcome: &RunOutcome) -> String {
        let mut output = String::new();

        let status = match outcome.status {
            RunStatus::Completed => self.paint("completed", Color::Green),
            RunStatus::Restricted => self.paint("stopped: restricted region", Color::Yellow),
            RunStatus::GateUnavailable => self.paint("stopped: IP lookup unavailable", Color::Red),
            RunStatus::Cancelled => self.paint("cancelled", Color::Yellow),
            RunStatus::TimedOut => self.paint("timed out", Color::Red),
        };

        let failures = outcome
            .results
            .iter()
            .filter(|r| !r.result.is_success())
            .count();

        let _ = writeln!(
            output,
            "Run {}: {} results ({} failed) in {:.0} ms",
            status,
            outcome.len(),
            failures,
            outcome.elapsed.as_secs_f64() * 1000.0
        );
        if !outcome.fired_waves.is_empty() {
            let _ = writeln!(output, "Extra checks: {}", outcome.fired_waves.join(", "));
        }

        let undelivered: Vec<String> = outcome
            .results
            .iter()
            .filter(|r| !r.delivered)
            .map(|r| label(&r.key))
            .collect();
        if !undelivered.is_empty() {
            let _ = writeln!(output, "Not reported: {}", undelivered.join(", "));
        }

        output.trim_end().to_string()
    }

    /// Clipboard-style list of the raw addresses, when the outcome has them
    pub fn addresses(&self, outcome: &RunOutcome) -> Option<String> {
        match outcome.get(&ProbeKey::IP_INFO) {
            Some(ProbeResult::Success(ProbePayload::Ip(report))) => Some(report.addresses()),
            _ => None,
        }
    }
}

//! Type definitions and aliases

use std::borrow::Cow;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::models::{FreedomReport, IpReport, StreamingReport};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Name of a check, unique within one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeKey(Cow<'static, str>);

impl ProbeKey {
    /// IP / region lookup; the gate of the standard plan
    pub const IP_INFO: ProbeKey = ProbeKey::from_static("ip_info");
    /// Censorship indicator
    pub const NETWORK_STATUS: ProbeKey = ProbeKey::from_static("network_status");
    /// Google's preferred-domain region
    pub const GOOGLE_REGION: ProbeKey = ProbeKey::from_static("google_region");
    /// GitHub raw content latency
    pub const GITHUB_SPEED: ProbeKey = ProbeKey::from_static("github_speed");
    /// Academic institution IP login
    pub const ACADEMIC_NAME: ProbeKey = ProbeKey::from_static("academic_name");
    /// Netflix catalogue availability
    pub const NETFLIX: ProbeKey = ProbeKey::from_static("netflix");
    /// Disney+ availability
    pub const DISNEY_PLUS: ProbeKey = ProbeKey::from_static("disney_plus");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ProbeKey {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Probe-specific success payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbePayload {
    /// Plain text answer
    Text { value: String },
    /// Nothing to report (e.g. no academic login)
    Empty,
    /// Measured latency in milliseconds
    Latency { millis: f64 },
    /// Domestic / foreign IP identification
    Ip(IpReport),
    /// Censorship indicator
    Freedom(FreedomReport),
    /// Streaming service availability
    Streaming(StreamingReport),
    /// The host sits in a region where probing must stop
    Restricted { country_code: String },
}

impl ProbePayload {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Text { value: value.into() }
    }
}

/// Why a probe did not produce a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    /// The probe's timeout elapsed
    Timeout,
    /// Network error or malformed response
    TransportError(String),
    /// The run was cancelled while the probe was in flight
    Cancelled,
    /// Never launched because the gate reported a restricted region
    Terminated,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::TransportError(detail) => write!(f, "transport error: {}", detail),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Terminated => f.write_str("terminated"),
        }
    }
}

/// Outcome of one probe; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ProbeResult {
    Success(ProbePayload),
    Failure(FailureKind),
}

impl ProbeResult {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Success(ProbePayload::text(value))
    }

    pub fn restricted<S: Into<String>>(country_code: S) -> Self {
        Self::Success(ProbePayload::Restricted { country_code: country_code.into() })
    }

    pub fn transport_error<S: Into<String>>(detail: S) -> Self {
        Self::Failure(FailureKind::TransportError(detail.into()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Country code carried by the restricted variant, if any
    pub fn restricted_country(&self) -> Option<&str> {
        match self {
            Self::Success(ProbePayload::Restricted { country_code }) => Some(country_code),
            _ => None,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted_country().is_some()
    }

    pub fn payload(&self) -> Option<&ProbePayload> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(kind) => Some(kind),
        }
    }

    /// Classify a probe error into a failure result
    pub fn from_error(error: &AppError) -> Self {
        match error {
            AppError::Timeout(_) => Self::Failure(FailureKind::Timeout),
            AppError::Cancelled(_) => Self::Failure(FailureKind::Cancelled),
            other => Self::transport_error(other.to_string()),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every launched probe reached a terminal result
    Completed,
    /// The gate reported a restricted region
    Restricted,
    /// The gate could not even be attempted
    GateUnavailable,
    /// Cancelled through the run context
    Cancelled,
    /// The overall timeout ceiling elapsed
    TimedOut,
}

impl RunStatus {
    /// Whether deliveries stopped before every launched probe finished
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut)
    }
}

/// Serialize a duration as fractional milliseconds
pub(crate) fn serialize_millis<S>(duration: &std::time::Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

//! Network Status Checker
//!
//! Probes a host's network reachability (domestic and foreign IP, censorship
//! indicators, regional routing, third-party service availability) and
//! streams every result to a sink the moment it completes. Dependent checks
//! are launched at runtime when an earlier result calls for them.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod plan;
pub mod probe;
pub mod probes;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::Config;
pub use orchestrator::{ChannelSink, FnSink, Orchestrator, ResultSink, RunContext, RunOutcome};
pub use output::ConsoleSink;
pub use plan::{Plan, PlanBuilder, Wave};
pub use probe::{Probe, ProbeContext, ProbeFactory};
pub use session::{Session, SessionSummary};
pub use types::{FailureKind, ProbeKey, ProbePayload, ProbeResult, RunStatus};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Build metadata exported by build.rs
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
    /// The gate chains four requests
    pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);
    pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(2);
    /// Per-request timeout of the freedom probe
    pub const FREEDOM_REQUEST_TIMEOUT: Duration = Duration::from_millis(500);
    pub const FREEDOM_ATTEMPTS: usize = 2;
    pub const DEFAULT_RESTRICTED_COUNTRIES: &[&str] = &["CU", "IR", "KP", "SY"];
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DESKTOP_USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

    pub mod endpoints {
        pub const DOMESTIC_IP_URL: &str = "https://4.ipw.cn";
        pub const FOREIGN_IP_URL: &str = "http://ip-api.com/line?fields=query";
        pub const GEO_LOOKUP_URL: &str = "http://ip-api.com/json";
        pub const FREEDOM_URLS: &[&str] = &[
            "https://www.v2ex.com/generate_204",
            "https://www.youtube.com/generate_204",
            "https://am.i.mullvad.net/ip",
        ];
        pub const GOOGLE_URL: &str = "https://www.google.com";
        pub const GITHUB_URL: &str = "https://raw.githubusercontent.com";
        pub const ACADEMIC_LOGIN_URL: &str =
            "https://login.cnki.net/TopLogin/api/loginapi/IpLoginFlush";
        /// A licensed title, only visible with the full catalogue
        pub const NETFLIX_TITLE_URL: &str = "https://www.netflix.com/title/81280792";
        /// A Netflix original, visible wherever the service operates
        pub const NETFLIX_ORIGINAL_URL: &str = "https://www.netflix.com/title/80018499";
        pub const DISNEY_PLUS_URL: &str = "https://www.disneyplus.com";
    }
}

//! Concrete network probes and the standard plan that wires them together

pub mod academic;
pub mod freedom;
pub mod github_speed;
pub mod google_region;
pub mod ip_info;
pub mod streaming;

pub use academic::AcademicProbe;
pub use freedom::FreedomProbe;
pub use github_speed::GithubSpeedProbe;
pub use google_region::GoogleRegionProbe;
pub use ip_info::IpInfoProbe;
pub use streaming::{DisneyPlusProbe, NetflixProbe};

use crate::error::Result;
use crate::models::Config;
use crate::plan::{Plan, Wave};
use crate::probe::cloning_factory;
use crate::types::{ProbeKey, ProbePayload, ProbeResult};

/// Name of the conditional wave checking streaming services
pub const STREAMING_WAVE: &str = "streaming";

/// Fires the streaming wave once the censorship indicator reports a free network
pub fn network_is_free(_key: &ProbeKey, result: &ProbeResult) -> bool {
    matches!(result.payload(), Some(ProbePayload::Freedom(report)) if report.is_free())
}

/// Gate `ip_info`, then the four basic checks, then streaming when the network is free
pub fn standard_plan(config: &Config) -> Result<Plan> {
    let endpoints = &config.endpoints;
    let timeout = config.probe_timeout();

    let mut builder = Plan::builder()
        .gate(ProbeKey::IP_INFO, config.gate_timeout(), cloning_factory(IpInfoProbe::from_config(config)))
        .probe(
            ProbeKey::NETWORK_STATUS,
            timeout,
            cloning_factory(FreedomProbe::new(endpoints.freedom_urls.clone())),
        )
        .probe(
            ProbeKey::GOOGLE_REGION,
            timeout,
            cloning_factory(GoogleRegionProbe::new(endpoints.google_url.clone())),
        )
        .probe(
            ProbeKey::GITHUB_SPEED,
            timeout,
            cloning_factory(GithubSpeedProbe::new(endpoints.github_url.clone())),
        )
        .probe(
            ProbeKey::ACADEMIC_NAME,
            timeout,
            cloning_factory(AcademicProbe::new(endpoints.academic_login_url.clone())),
        );

    if config.enable_streaming {
        builder = builder.wave(
            Wave::new(STREAMING_WAVE, ProbeKey::NETWORK_STATUS, network_is_free)
                .probe(ProbeKey::NETFLIX, timeout, cloning_factory(NetflixProbe::new(endpoints)))
                .probe(
                    ProbeKey::DISNEY_PLUS,
                    timeout,
                    cloning_factory(DisneyPlusProbe::new(endpoints.disney_plus_url.clone())),
                ),
        );
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FreedomReport;

    #[test]
    fn test_standard_plan_layout() {
        let plan = standard_plan(&Config::default()).unwrap();
        assert_eq!(plan.gate().key, ProbeKey::IP_INFO);
        assert_eq!(plan.initial().len(), 4);
        assert_eq!(plan.waves().len(), 1);
        assert_eq!(plan.waves()[0].name(), STREAMING_WAVE);
        assert_eq!(plan.len(), 7);
    }

    #[test]
    fn test_streaming_can_be_disabled() {
        let config = Config { enable_streaming: false, ..Config::default() };
        let plan = standard_plan(&config).unwrap();
        assert!(plan.waves().is_empty());
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_network_is_free_predicate() {
        let free = ProbeResult::Success(ProbePayload::Freedom(FreedomReport::new(2, 3)));
        let censored = ProbeResult::Success(ProbePayload::Freedom(FreedomReport::new(1, 3)));
        assert!(network_is_free(&ProbeKey::NETWORK_STATUS, &free));
        assert!(!network_is_free(&ProbeKey::NETWORK_STATUS, &censored));
        assert!(!network_is_free(&ProbeKey::NETWORK_STATUS, &ProbeResult::transport_error("down")));
    }
}

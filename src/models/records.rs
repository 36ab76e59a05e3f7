//! Structured payload records produced by the concrete probes

use serde::{Deserialize, Serialize};

/// One public address together with its geolocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpEndpoint {
    pub ip: String,
    /// `"{region}, {country}"` as reported by the geo service
    pub region: String,
    pub country_code: String,
}

/// Addresses seen by domestic and foreign websites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum IpReport {
    /// Both vantage points see the same address
    Single { endpoint: IpEndpoint },
    /// Split routing: domestic and foreign sites see different addresses
    Split { domestic: IpEndpoint, foreign: IpEndpoint },
}

impl IpReport {
    /// Build the report, collapsing identical addresses into one entry
    pub fn from_endpoints(domestic: IpEndpoint, foreign: IpEndpoint) -> Self {
        if domestic.ip == foreign.ip {
            Self::Single { endpoint: domestic }
        } else {
            Self::Split { domestic, foreign }
        }
    }

    pub fn endpoints(&self) -> Vec<&IpEndpoint> {
        match self {
            Self::Single { endpoint } => vec![endpoint],
            Self::Split { domestic, foreign } => vec![domestic, foreign],
        }
    }

    /// Clipboard-style rendering of the raw addresses
    pub fn addresses(&self) -> String {
        match self {
            Self::Single { endpoint } => endpoint.ip.clone(),
            Self::Split { domestic, foreign } => {
                format!("domestic IP: {}, foreign IP: {}", domestic.ip, foreign.ip)
            }
        }
    }
}

/// Result of the censorship indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreedomReport {
    /// Number of probe URLs that answered
    pub reachable: usize,
    pub total: usize,
}

impl FreedomReport {
    /// Minimum number of reachable URLs for the network to count as free
    pub const FREE_THRESHOLD: usize = 2;

    pub fn new(reachable: usize, total: usize) -> Self {
        Self { reachable, total }
    }

    pub fn is_free(&self) -> bool {
        self.reachable >= Self::FREE_THRESHOLD
    }
}

/// Availability of a streaming service from this network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingStatus {
    /// Full catalogue
    Unlocked,
    /// Only the service's self-produced titles
    OriginalsOnly,
    /// Service reachable (no catalogue distinction)
    Available,
    /// Service refuses this region
    Blocked,
}

impl StreamingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unlocked => "unlocked",
            Self::OriginalsOnly => "originals only",
            Self::Available => "available",
            Self::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingReport {
    pub service: String,
    pub status: StreamingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(ip: &str, code: &str) -> IpEndpoint {
        IpEndpoint {
            ip: ip.to_string(),
            region: format!("Somewhere, {}", code),
            country_code: code.to_string(),
        }
    }

    #[test]
    fn test_identical_addresses_collapse() {
        let report = IpReport::from_endpoints(endpoint("1.2.3.4", "CN"), endpoint("1.2.3.4", "CN"));
        assert!(matches!(report, IpReport::Single { .. }));
        assert_eq!(report.endpoints().len(), 1);
        assert_eq!(report.addresses(), "1.2.3.4");
    }

    #[test]
    fn test_split_routing() {
        let report = IpReport::from_endpoints(endpoint("1.2.3.4", "CN"), endpoint("5.6.7.8", "JP"));
        assert_eq!(report.endpoints().len(), 2);
        assert_eq!(report.addresses(), "domestic IP: 1.2.3.4, foreign IP: 5.6.7.8");
    }

    #[test]
    fn test_freedom_threshold() {
        assert!(!FreedomReport::new(1, 3).is_free());
        assert!(FreedomReport::new(2, 3).is_free());
        assert!(FreedomReport::new(3, 3).is_free());
    }
}

//! Public IP and region lookup; the gate of the standard plan

use crate::error::{AppError, ErrorContext, Result};
use crate::models::{Config, IpEndpoint, IpReport};
use crate::probe::{Probe, ProbeContext};
use crate::types::ProbePayload;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Geo lookup response (ip-api.com layout)
#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "regionName", default)]
    region_name: String,
    #[serde(default)]
    country: String,
    #[serde(rename = "countryCode", default)]
    country_code: String,
}

#[derive(Debug, Clone)]
pub struct IpInfoProbe {
    domestic_ip_url: String,
    foreign_ip_url: String,
    geo_lookup_url: String,
    restricted_countries: Vec<String>,
}

impl IpInfoProbe {
    pub fn from_config(config: &Config) -> Self {
        Self {
            domestic_ip_url: config.endpoints.domestic_ip_url.clone(),
            foreign_ip_url: config.endpoints.foreign_ip_url.clone(),
            geo_lookup_url: config.endpoints.geo_lookup_url.clone(),
            restricted_countries: config.restricted_countries.clone(),
        }
    }

    fn is_restricted(&self, country_code: &str) -> bool {
        self.restricted_countries
            .iter()
            .any(|code| code.eq_ignore_ascii_case(country_code))
    }

    async fn locate(&self, client: &Client, ip: &str) -> Result<IpEndpoint> {
        let url = format!("{}/{}", self.geo_lookup_url.trim_end_matches('/'), ip);
        let geo: GeoResponse = client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("geo lookup for {}", ip))?
            .json()
            .await
            .with_context(|| format!("geo lookup for {}", ip))?;

        if geo.status.as_deref() == Some("fail") {
            return Err(AppError::parse(format!(
                "geo lookup for {} failed: {}",
                ip,
                geo.message.unwrap_or_else(|| "unknown reason".to_string())
            )));
        }

        Ok(IpEndpoint {
            ip: ip.to_string(),
            region: format!("{}, {}", geo.region_name, geo.country),
            country_code: geo.country_code,
        })
    }
}

/// Fetch a plain-text address
async fn fetch_ip(client: &Client, url: &str) -> Result<String> {
    let body = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("IP lookup via {}", url))?
        .text()
        .await
        .with_context(|| format!("IP lookup via {}", url))?;

    let ip = body.trim();
    if ip.is_empty() {
        return Err(AppError::parse(format!("IP lookup via {} returned an empty body", url)));
    }
    Ok(ip.to_string())
}

#[async_trait]
impl Probe for IpInfoProbe {
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let client = ctx.client();
        let (domestic_ip, foreign_ip) = tokio::try_join!(
            fetch_ip(client, &self.domestic_ip_url),
            fetch_ip(client, &self.foreign_ip_url),
        )?;

        let report = if domestic_ip == foreign_ip {
            let endpoint = self.locate(client, &domestic_ip).await?;
            IpReport::Single { endpoint }
        } else {
            let (domestic, foreign) = tokio::try_join!(
                self.locate(client, &domestic_ip),
                self.locate(client, &foreign_ip),
            )?;
            IpReport::from_endpoints(domestic, foreign)
        };

        if let Some(endpoint) = report.endpoints().into_iter().find(|e| self.is_restricted(&e.country_code)) {
            return Ok(ProbePayload::Restricted {
                country_code: endpoint.country_code.to_ascii_uppercase(),
            });
        }

        Ok(ProbePayload::Ip(report))
    }
}

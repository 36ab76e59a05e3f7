//! Streaming service availability

use crate::error::{AppError, ErrorContext, Result};
use crate::models::{Endpoints, StreamingReport, StreamingStatus};
use crate::probe::{Probe, ProbeContext};
use crate::types::ProbePayload;
use async_trait::async_trait;
use reqwest::StatusCode;

fn report(service: &str, status: StreamingStatus) -> ProbePayload {
    ProbePayload::Streaming(StreamingReport {
        service: service.to_string(),
        status,
    })
}

/// Netflix: a licensed title means the full catalogue, an original means the
/// service works with a reduced catalogue
#[derive(Debug, Clone)]
pub struct NetflixProbe {
    title_url: String,
    original_url: String,
}

impl NetflixProbe {
    pub fn new(endpoints: &Endpoints) -> Self {
        Self {
            title_url: endpoints.netflix_title_url.clone(),
            original_url: endpoints.netflix_original_url.clone(),
        }
    }
}

#[async_trait]
impl Probe for NetflixProbe {
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let client = ctx.client();

        let title = client.get(&self.title_url).send().await.context("Netflix title page")?;
        if title.status() == StatusCode::OK {
            return Ok(report("Netflix", StreamingStatus::Unlocked));
        }

        let original = client.get(&self.original_url).send().await.context("Netflix original page")?;
        let status = if original.status() == StatusCode::OK {
            StreamingStatus::OriginalsOnly
        } else {
            StreamingStatus::Blocked
        };
        Ok(report("Netflix", status))
    }
}

#[derive(Debug, Clone)]
pub struct DisneyPlusProbe {
    url: String,
}

impl DisneyPlusProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Probe for DisneyPlusProbe {
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let response = ctx.client().get(&self.url).send().await.context("Disney+ homepage")?;

        // Unsupported regions are redirected to an "unavailable" page
        if response.url().as_str().contains("unavailable") || response.status() == StatusCode::FORBIDDEN {
            return Ok(report("Disney+", StreamingStatus::Blocked));
        }
        if !response.status().is_success() {
            return Err(AppError::http_request(format!(
                "Disney+ homepage answered {}", response.status()
            )));
        }
        Ok(report("Disney+", StreamingStatus::Available))
    }
}

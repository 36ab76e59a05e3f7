//! GitHub raw content latency

use crate::error::{ErrorContext, Result};
use crate::probe::{Probe, ProbeContext};
use crate::types::ProbePayload;
use async_trait::async_trait;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct GithubSpeedProbe {
    url: String,
}

impl GithubSpeedProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Probe for GithubSpeedProbe {
    /// Any answer to the HEAD request counts; only its latency matters
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let start = Instant::now();
        ctx.client()
            .head(&self.url)
            .send()
            .await
            .context("GitHub HEAD request")?;
        let millis = start.elapsed().as_secs_f64() * 1000.0;

        Ok(ProbePayload::Latency { millis })
    }
}

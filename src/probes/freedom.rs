//! Censorship indicator: can sites that are commonly blocked be reached?

use crate::defaults::{FREEDOM_ATTEMPTS, FREEDOM_REQUEST_TIMEOUT};
use crate::error::Result;
use crate::models::FreedomReport;
use crate::probe::{Probe, ProbeContext};
use crate::types::ProbePayload;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FreedomProbe {
    urls: Vec<String>,
    request_timeout: Duration,
    attempts: usize,
}

impl FreedomProbe {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            request_timeout: FREEDOM_REQUEST_TIMEOUT,
            attempts: FREEDOM_ATTEMPTS,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// A URL counts as reachable on its first 200 or 204 answer
    async fn reachable(&self, client: &Client, url: &str) -> bool {
        for _ in 0..self.attempts.max(1) {
            let answered = client
                .get(url)
                .timeout(self.request_timeout)
                .send()
                .await;
            if let Ok(response) = answered {
                if matches!(response.status(), StatusCode::OK | StatusCode::NO_CONTENT) {
                    return true;
                }
            }
        }
        false
    }
}

#[async_trait]
impl Probe for FreedomProbe {
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let client = ctx.client();
        let checks = self.urls.iter().map(|url| self.reachable(client, url));
        let reachable = join_all(checks).await.into_iter().filter(|ok| *ok).count();

        Ok(ProbePayload::Freedom(FreedomReport::new(reachable, self.urls.len())))
    }
}

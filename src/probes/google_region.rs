//! Google's preferred-domain region

use crate::error::{AppError, ErrorContext, Result};
use crate::probe::{Probe, ProbeContext};
use crate::types::ProbePayload;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::OnceLock;

const PREFDOMAIN_LINK: &str = r#"a[href*="setprefdomain"]"#;

/// Region reported when the homepage offers no domain switch
pub const GLOBAL_REGION: &str = "Global";

#[derive(Debug, Clone)]
pub struct GoogleRegionProbe {
    url: String,
}

impl GoogleRegionProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

fn prefdomain_selector() -> Result<&'static Selector> {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    if let Some(selector) = SELECTOR.get() {
        return Ok(selector);
    }
    let selector = Selector::parse(PREFDOMAIN_LINK)
        .map_err(|e| AppError::internal(format!("invalid prefdomain selector: {}", e)))?;
    Ok(SELECTOR.get_or_init(|| selector))
}

/// Extract the region from the homepage's `setprefdomain` link.
///
/// The Hong Kong domain preferring `US` is what mainland visitors get.
pub fn parse_region(html: &str) -> Result<String> {
    let selector = prefdomain_selector()?;
    let document = Html::parse_document(html);
    let Some(href) = document
        .select(selector)
        .find_map(|link| link.value().attr("href"))
    else {
        return Ok(GLOBAL_REGION.to_string());
    };

    let domain = href
        .split("//")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or_default();
    let prefdom = href
        .split('=')
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .ok_or_else(|| AppError::parse(format!("setprefdomain link without parameters: {}", href)))?;

    if domain == "www.google.com.hk" && prefdom == "US" {
        Ok("CN".to_string())
    } else {
        Ok(prefdom.to_string())
    }
}

#[async_trait]
impl Probe for GoogleRegionProbe {
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let html = ctx
            .client()
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("Google homepage")?
            .text()
            .await
            .context("Google homepage")?;

        Ok(ProbePayload::text(parse_region(&html)?))
    }
}

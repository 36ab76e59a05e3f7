//! Academic institution recognised through IP login

use crate::defaults::DESKTOP_USER_AGENT;
use crate::error::{AppError, ErrorContext, Result};
use crate::probe::{Probe, ProbeContext};
use crate::types::ProbePayload;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "IsSuccess", default)]
    is_success: bool,
    #[serde(rename = "ShowName", default)]
    show_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AcademicProbe {
    url: String,
}

impl AcademicProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The endpoint wraps its JSON in one extra character on each side
pub fn parse_login(body: &str) -> Result<Option<String>> {
    let body = body.trim();
    let mut chars = body.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return Err(AppError::parse("academic login response is too short"));
    };
    let inner = &body[first.len_utf8()..body.len() - last.len_utf8()];

    let response: LoginResponse = serde_json::from_str(inner)?;
    Ok(response
        .show_name
        .filter(|name| response.is_success && !name.trim().is_empty()))
}

#[async_trait]
impl Probe for AcademicProbe {
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload> {
        let body = ctx
            .client()
            .get(&self.url)
            .header(USER_AGENT, DESKTOP_USER_AGENT)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("academic login lookup")?
            .text()
            .await
            .context("academic login lookup")?;

        Ok(match parse_login(&body)? {
            Some(name) => ProbePayload::text(name),
            None => ProbePayload::Empty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_in() {
        let body = r#"({"IsSuccess":true,"ShowName":"Example University"})"#;
        assert_eq!(parse_login(body).unwrap(), Some("Example University".to_string()));
    }

    #[test]
    fn test_not_logged_in() {
        let body = r#"({"IsSuccess":false,"ShowName":"ignored"})"#;
        assert_eq!(parse_login(body).unwrap(), None);
    }

    #[test]
    fn test_malformed_body() {
        assert!(parse_login("x").is_err());
        assert_eq!(parse_login("(not json)").unwrap_err().category(), "PARSE");
    }
}

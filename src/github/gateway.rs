// GitHub API transport.
// A single-GET seam over reqwest with a fixed request timeout. Replies carry
// the status, rate-limit headers, and raw body so the fetcher owns all
// interpretation; a scripted fake stands in for tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};

use crate::error::{MontraError, Result};

use super::rate_limit::RateLimitHeaders;

const GITHUB_API_BASE: &str = "https://api.github.com";

/// In-flight requests are abandoned after 10 seconds.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One round-trip's worth of response data.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: u16,
    pub rate: RateLimitHeaders,
    pub body: String,
}

/// Transport seam for the GitHub REST API.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<GatewayReply>;
}

/// HTTPS transport with the API's default headers.
pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("montra"));

        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| MontraError::Other(e.to_string()))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(MontraError::Transport)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<GatewayReply> {
        let url = format!("{}{}", GITHUB_API_BASE, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let rate = parse_rate_headers(response.headers());
        let body = response.text().await.map_err(classify)?;

        Ok(GatewayReply { status, rate, body })
    }
}

/// The deadline cancels the in-flight request; everything else is a
/// transport failure.
fn classify(error: reqwest::Error) -> MontraError {
    if error.is_timeout() {
        MontraError::Timeout
    } else {
        MontraError::Transport(error)
    }
}

/// Parse x-ratelimit-* headers, tolerating absent or malformed values.
fn parse_rate_headers(headers: &HeaderMap) -> RateLimitHeaders {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    };

    RateLimitHeaders {
        remaining: parse("x-ratelimit-remaining"),
        reset_epoch: parse("x-ratelimit-reset"),
    }
}

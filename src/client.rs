//! HTTP client for the agent backend.
//!
//! Three endpoints: `POST /chat` streams a plain-text body for one turn,
//! `GET /tools` lists the tools the backend knows about, `GET /health`
//! answers liveness probes. The chat call hands back a transport adapter;
//! interpreting the bytes is entirely the engine's job.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::config::Config;
use crate::logging;
use crate::models::{ChatRequest, HealthInfo, ToolsInfo};
use crate::stream::HttpStreamTransport;

/// Client for the deep research agent backend.
#[must_use]
#[derive(Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
    stall_timeout: Duration,
    request_timeout: Duration,
}

impl BackendClient {
    /// Create a client from CLI configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.backend_url();
        logging::info(format!("Backend URL: {base_url}"));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            stall_timeout: config.stall_timeout(),
            request_timeout: config.request_timeout(),
        })
    }

    /// Start one streaming turn. Returns once response headers are in; the
    /// body streams through the returned transport.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<HttpStreamTransport> {
        let url = format!("{}/chat", self.base_url);
        logging::info(format!(
            "Starting chat turn: {} message(s), {} tool(s), deep_research={}",
            request.messages.len(),
            request.tools.len(),
            request.deep_research_mode
        ));

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat request failed: HTTP {status}: {body}");
        }

        Ok(HttpStreamTransport::new(response, self.stall_timeout))
    }

    /// Fetch the backend's tool listing.
    pub async fn list_tools(&self) -> Result<ToolsInfo> {
        let url = format!("{}/tools", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("tools request failed: HTTP {status}");
        }
        response
            .json::<ToolsInfo>()
            .await
            .context("failed to parse tools response")
    }

    /// Probe the backend's health endpoint.
    pub async fn health(&self) -> Result<HealthInfo> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .with_context(|| format!("failed to reach backend at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("health request failed: HTTP {status}");
        }
        response
            .json::<HealthInfo>()
            .await
            .context("failed to parse health response")
    }
}

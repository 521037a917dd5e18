use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::SummaryFetcher;
use crate::config::Config;
use crate::error::SummaryError;
use crate::types::{ConnectionDetails, Summary};

/// Fetch client that POSTs connection details to a fixed endpoint.
#[derive(Clone)]
pub struct HttpSummaryClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSummaryClient {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Build a client with the configured timeouts and optional proxy.
    pub fn from_config(cfg: &Config) -> Result<Self, SummaryError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("summary-sync/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.fetch_timeout());
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        Ok(Self::new(builder.build()?, cfg.external_url.clone()))
    }

    /// Shorthand for tests and tools that only need a timeout.
    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, endpoint))
    }
}

#[async_trait]
impl SummaryFetcher for HttpSummaryClient {
    async fn fetch_summary(&self, details: &ConnectionDetails) -> Result<Summary, SummaryError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(details)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            error!(endpoint = %self.endpoint, %status, "summary service returned error status");
            return Err(SummaryError::UpstreamStatus(status));
        }

        let body = resp.bytes().await?;
        let summary: Summary = serde_json::from_slice(&body)?;
        debug!(
            id = %summary.id,
            schemas = summary.schemas.len(),
            host = %details.host,
            "fetched summary"
        );
        Ok(summary)
    }
}

// src/fetch.rs

use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// The "fetch a JSON document over HTTPS" capability the key provider depends on.
///
/// Implementations report non-success statuses as [`FetchError::Status`] and
/// undecodable bodies as [`FetchError::Body`]; they must not retry.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &Url) -> Result<serde_json::Value, FetchError>;
}

/// The default fetcher, backed by `reqwest`.
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { http_client })
    }

    /// Wraps an existing client, e.g. one with custom TLS roots or a proxy.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url), err)]
    async fn fetch_json(&self, url: &Url) -> Result<serde_json::Value, FetchError> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        debug!("GET {} -> {}", url, status);

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

//! HTTP transport
//!
//! The pipeline talks to the remote API only through [`Transport`], so
//! tests can swap in scripted responses without a network.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Whether intermediaries may serve a cached response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Default,
    /// Send `Cache-Control: no-store` and `Pragma: no-cache`
    NoStore,
}

/// Fetches one JSON document
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and parse the body as JSON.
    ///
    /// Non-success statuses are returned as [`IngestError::Status`].
    async fn get_json(&self, url: &str, cache: CachePolicy) -> Result<Value>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(HttpTransport { client })
    }

    fn no_store_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, cache: CachePolicy) -> Result<Value> {
        let mut request = self.client.get(url);
        if cache == CachePolicy::NoStore {
            request = request.headers(Self::no_store_headers());
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "GET");

        if !status.is_success() {
            return Err(IngestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

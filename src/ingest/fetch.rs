//! Playlist fetcher
//!
//! HTTP GET with a bounded wait for response headers. The body transfer is
//! not bounded, so a stalled body can hold a task indefinitely.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Response};
use url::Url;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct PlaylistFetcher {
    client: Client,
    header_timeout: Duration,
}

impl PlaylistFetcher {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| IngestError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            header_timeout: Duration::from_secs(config.response_header_timeout_secs),
        })
    }

    /// Send the request and wait for a successful status line and headers.
    pub async fn open(&self, url: &Url) -> Result<Response> {
        let fetch_error = |reason: String| IngestError::Fetch {
            url: url.to_string(),
            reason,
        };

        let send = self.client.get(url.as_str()).send();
        let response = tokio::time::timeout(self.header_timeout, send)
            .await
            .map_err(|_| {
                fetch_error(format!(
                    "no response headers within {:?}",
                    self.header_timeout
                ))
            })?
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }
        Ok(response)
    }

    /// Fetch a whole playlist body.
    pub async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let response = self.open(url).await?;
        response.bytes().await.map_err(|e| IngestError::Fetch {
            url: url.to_string(),
            reason: format!("reading body: {}", e),
        })
    }
}

//! HTTP transport backed by reqwest.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::Transport;
use crate::core::error::NetworkError;

/// Plain HTTP(S) GET transport
pub struct HttpTransport {
    /// HTTP client
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Create from the resolved configuration
    pub fn from_config(config: &crate::config::ResolvedConfig) -> Result<Self> {
        Self::new(config.network.timeout(), &config.network.user_agent)
    }
}

/// Classify a reqwest error into a [`NetworkError`]
fn classify(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else if err.is_builder() {
        NetworkError::InvalidUrl(err.to_string())
    } else if err.is_connect() {
        NetworkError::Connect(err.to_string())
    } else if let Some(status) = err.status() {
        NetworkError::Status {
            code: status.as_u16(),
        }
    } else {
        NetworkError::Transport(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(classify)?;
        debug!(url, bytes = body.len(), "Downloaded");

        Ok(body.to_vec())
    }
}

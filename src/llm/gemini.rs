//! Google Gemini backend implementation.
//!
//! Uses the `generateContent` REST endpoint. The API key travels in the query
//! string, so URLs are never logged.

use super::{Generator, Reply};
use crate::config::Config;
use crate::protocol::GenerateRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Gemini backend for the `generateContent` API.
pub struct GeminiBackend {
    model: String,
    url: String,
    client: Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend. No request timeout is set.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_client(config, client))
    }

    /// Create a backend around an existing HTTP client.
    pub fn with_client(config: &Config, client: Client) -> Self {
        Self {
            model: config.model.clone(),
            url: config.endpoint_url(),
            client,
        }
    }
}

#[async_trait]
impl Generator for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<Reply> {
        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to connect to Gemini API")?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read Gemini response body")?;

        debug!(status, bytes = body.len(), "Received Gemini reply");
        Ok(Reply { status, body })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

//! Client for the external AI generation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use super::AiRequest;
use crate::{Error, Result};

/// Why a remote attempt produced no usable reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service returned {0}")]
    Status(u16),
    #[error("unparseable response: {0}")]
    Malformed(String),
    #[error("service did not return reply")]
    EmptyReply,
}

/// A provider that may answer a chat message over the network.
#[async_trait]
pub trait RemoteAi: Send + Sync {
    /// Attempt one generation. Timeouts are enforced by the caller.
    async fn generate(&self, request: &AiRequest) -> std::result::Result<String, RemoteFailure>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    reply: Option<String>,
}

/// Calls `POST {endpoint}/generate`.
pub struct HttpAiClient {
    http: reqwest::Client,
    generate_url: Url,
}

impl HttpAiClient {
    /// Create a client for `endpoint`, which must be an absolute URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        let base = endpoint.trim_end_matches('/');
        let generate_url = Url::parse(&format!("{}/generate", base))
            .map_err(|e| Error::Config(format!("Invalid AI service URL {}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, generate_url })
    }
}

#[async_trait]
impl RemoteAi for HttpAiClient {
    async fn generate(&self, request: &AiRequest) -> std::result::Result<String, RemoteFailure> {
        let response = self
            .http
            .post(self.generate_url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| RemoteFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteFailure::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RemoteFailure::Malformed(e.to_string()))?;

        body.reply
            .filter(|reply| !reply.trim().is_empty())
            .ok_or(RemoteFailure::EmptyReply)
    }
}

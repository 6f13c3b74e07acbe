//! Environment settings for the AI service.
//!
//! Nothing here is fatal: unknown providers and bad timeouts are logged and
//! replaced with defaults so the service always starts with the mock provider
//! available.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use shared::ai::{MockTemplate, OpenAiClient, RemoteAi};
use shared::{AiOrchestrator, Result};
use tracing::warn;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Mock,
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_provider = lookup("AI_PROVIDER").unwrap_or_else(|| "mock".to_string());
        let provider = match raw_provider.trim().to_lowercase().as_str() {
            "mock" => Provider::Mock,
            "openai" => Provider::OpenAi,
            other => {
                warn!("Unsupported AI_PROVIDER '{}'. Falling back to 'mock'.", other);
                Provider::Mock
            }
        };

        Self {
            provider,
            openai_api_key: lookup("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            request_timeout: parse_timeout(lookup("REQUEST_TIMEOUT").as_deref()),
        }
    }

    /// OpenAI in front of the mock template when configured, otherwise the
    /// mock template alone.
    pub fn orchestrator(&self) -> Result<AiOrchestrator> {
        let remote = match self.provider {
            Provider::OpenAi if self.openai_api_key.trim().is_empty() => {
                warn!("OPENAI_API_KEY not configured, serving mock replies");
                None
            }
            Provider::OpenAi => Some(Arc::new(OpenAiClient::new(
                self.openai_api_key.clone(),
                &self.openai_base_url,
                self.openai_model.clone(),
            )?) as Arc<dyn RemoteAi>),
            Provider::Mock => None,
        };

        Ok(AiOrchestrator::new(
            remote,
            Arc::new(MockTemplate),
            self.request_timeout,
        ))
    }
}

/// Seconds as a positive float; anything else yields the default.
fn parse_timeout(raw: Option<&str>) -> Duration {
    let default = Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS);
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        Ok(secs) => {
            warn!(
                "REQUEST_TIMEOUT must be > 0 but got {:.3}. Falling back to {:.1} seconds.",
                secs, DEFAULT_TIMEOUT_SECS
            );
            default
        }
        Err(_) => {
            warn!(
                "Invalid REQUEST_TIMEOUT value '{}'. Falling back to {:.1} seconds.",
                raw, DEFAULT_TIMEOUT_SECS
            );
            default
        }
    }
}

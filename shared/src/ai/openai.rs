//! OpenAI-compatible chat completions provider used by the AI service.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AiRequest, RemoteAi, RemoteFailure};
use crate::{Error, Result};

const SYSTEM_PROMPT: &str =
    "You are a helpful dental clinic assistant. Keep answers concise, safe, and non-diagnostic.";
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Calls `POST {base_url}/chat/completions` with a single user prompt.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    completions_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: &str, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

fn as_sentence(text: &str) -> String {
    let cleaned = text.trim();
    if cleaned.ends_with(['.', '!', '?']) {
        cleaned.to_string()
    } else {
        format!("{}.", cleaned)
    }
}

/// Flatten the request into the prompt sent to the model.
pub fn build_prompt(request: &AiRequest) -> String {
    let mut parts = vec![
        SYSTEM_PROMPT.to_string(),
        format!("Patient message: {}", as_sentence(&request.message)),
    ];

    if let Some(context) = &request.patient_context {
        parts.push(format!("Patient name: {}", as_sentence(&context.name)));
        if let Some(notes) = context.medical_notes.as_deref().filter(|n| !n.trim().is_empty()) {
            parts.push(format!("Notes: {}", as_sentence(notes)));
        }
    }

    parts.join(" ")
}

#[async_trait]
impl RemoteAi for OpenAiClient {
    async fn generate(&self, request: &AiRequest) -> std::result::Result<String, RemoteFailure> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(request) }],
            "temperature": TEMPERATURE,
        });

        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RemoteFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteFailure::Status(status.as_u16()));
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| RemoteFailure::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(RemoteFailure::EmptyReply)
    }
}

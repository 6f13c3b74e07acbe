//! AI reply generation with remote-to-local failover.
//!
//! The [`AiOrchestrator`] is built once at startup and shared by reference.
//! It asks a [`RemoteAi`] provider for a reply under a hard timeout and falls
//! back to a deterministic local [`FallbackGenerator`] on any failure.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub mod fallback;
pub mod openai;
pub mod orchestrator;
pub mod remote;

pub use fallback::{ClinicTemplate, FallbackGenerator, MockTemplate};
pub use openai::OpenAiClient;
pub use orchestrator::AiOrchestrator;
pub use remote::{HttpAiClient, RemoteAi, RemoteFailure};

/// Longest chat message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Patient details the reply may refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_notes: Option<String>,
}

/// A message to answer, optionally about a specific patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<PatientContext>,
}

impl AiRequest {
    /// Build a request, rejecting empty or oversized messages. Whitespace
    /// counts, matching the chat route's `message` field.
    pub fn new(message: impl Into<String>, patient_context: Option<PatientContext>) -> Result<Self> {
        let message = message.into();
        if message.is_empty() {
            return Err(Error::invalid("message: String must contain at least 1 character(s)"));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(Error::invalid(format!(
                "message: String must contain at most {} character(s)",
                MAX_MESSAGE_CHARS
            )));
        }
        Ok(Self {
            message,
            patient_context,
        })
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Remote,
    Fallback,
}

/// A non-empty reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiReply {
    text: String,
    source: ReplySource,
}

impl AiReply {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> ReplySource {
        self.source
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

//! Remote-first reply generation with a single local failover.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use super::{AiReply, AiRequest, ClinicTemplate, FallbackGenerator, HttpAiClient, RemoteAi, RemoteFailure, ReplySource};
use crate::{Error, Result};

/// Chooses between a remote provider and the local fallback.
///
/// Holds no mutable state; concurrent calls are independent.
#[derive(Clone)]
pub struct AiOrchestrator {
    remote: Option<Arc<dyn RemoteAi>>,
    fallback: Arc<dyn FallbackGenerator>,
    timeout: Duration,
}

impl AiOrchestrator {
    pub fn new(
        remote: Option<Arc<dyn RemoteAi>>,
        fallback: Arc<dyn FallbackGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            remote,
            fallback,
            timeout,
        }
    }

    /// An orchestrator that never leaves the process.
    pub fn local(fallback: Arc<dyn FallbackGenerator>) -> Self {
        Self::new(None, fallback, Duration::ZERO)
    }

    /// Wire the HTTP client for `endpoint` (if any) in front of the clinic template.
    pub fn for_endpoint(endpoint: Option<&str>, remote_timeout: Duration) -> Result<Self> {
        let remote = match endpoint {
            Some(url) => Some(Arc::new(HttpAiClient::new(url)?) as Arc<dyn RemoteAi>),
            None => None,
        };
        Ok(Self::new(remote, Arc::new(ClinicTemplate), remote_timeout))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Produce a non-empty reply, failing over to the local template once.
    pub async fn generate(&self, request: &AiRequest) -> Result<AiReply> {
        if let Some(remote) = &self.remote {
            match self.attempt_remote(remote.as_ref(), request).await {
                Ok(text) => {
                    return Ok(AiReply {
                        text,
                        source: ReplySource::Remote,
                    })
                }
                Err(failure) => {
                    warn!(reason = %failure, "AI service failed, using fallback reply");
                }
            }
        }

        self.fallback_reply(request)
    }

    /// Dropping the timed-out future aborts the in-flight request.
    async fn attempt_remote(
        &self,
        remote: &dyn RemoteAi,
        request: &AiRequest,
    ) -> std::result::Result<String, RemoteFailure> {
        match timeout(self.timeout, remote.generate(request)).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => Ok(reply),
            Ok(Ok(_)) => Err(RemoteFailure::EmptyReply),
            Ok(Err(failure)) => Err(failure),
            Err(_) => Err(RemoteFailure::Timeout(self.timeout)),
        }
    }

    fn fallback_reply(&self, request: &AiRequest) -> Result<AiReply> {
        let text = self.fallback.compose(request);
        if text.trim().is_empty() {
            return Err(Error::AiUnavailable("fallback produced an empty reply".to_string()));
        }

        info!("Serving fallback AI reply");
        Ok(AiReply {
            text,
            source: ReplySource::Fallback,
        })
    }
}

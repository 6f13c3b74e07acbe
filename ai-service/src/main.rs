//! AI service Lambda - Handles /generate and /health.

use std::sync::Arc;

use ai_service::{handler, Settings};
use lambda_http::{run, service_fn, Error, Request};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env();
    let ai = Arc::new(settings.orchestrator()?);
    info!(
        provider = ?settings.provider,
        remote = ai.has_remote(),
        "AI service ready"
    );

    run(service_fn(move |event: Request| {
        let ai = Arc::clone(&ai);
        async move { Ok::<_, Error>(handler::handle(&ai, event).await) }
    }))
    .await
}

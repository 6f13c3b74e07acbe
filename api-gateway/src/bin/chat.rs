//! Chat Lambda - Conversation history and AI-assisted replies.

use std::sync::Arc;

use api_gateway::{routes, AppState};
use lambda_http::{run, service_fn, Error, Request};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::from_env().await?);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { Ok::<_, Error>(routes::chat::handle(&state, event).await) }
    }))
    .await
}

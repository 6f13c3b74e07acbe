//! Health Lambda - Handles /health.

use api_gateway::routes;
use lambda_http::{run, service_fn, Error, Request};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(|event: Request| async move {
        Ok::<_, Error>(routes::health::handle(event).await)
    }))
    .await
}

//! Application state shared across requests.

use std::sync::Arc;

use shared::db::{create_pool, PgStore};
use shared::validation::RouteSchema;
use shared::{
    get_database_credentials, resolve_jwt_secret, AiOrchestrator, AuthGuard, Config, Pipeline,
    Result, Store, TokenService,
};
use tracing::info;

/// Built once per Lambda container and shared by reference.
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub store: Arc<dyn Store>,
    pub ai: AiOrchestrator,
}

impl AppState {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn Store>, ai: AiOrchestrator) -> Self {
        Self { tokens, store, ai }
    }

    /// Load configuration, secrets and the database pool.
    pub async fn from_env() -> Result<Self> {
        let config = Config::from_env()?;

        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        let jwt_secret = resolve_jwt_secret(&secrets_client, &config).await?;
        let tokens = TokenService::new(&jwt_secret, config.jwt_expires_in)?;

        let credentials = get_database_credentials(&secrets_client, &config.db_secret_arn).await?;
        let pool = create_pool(&config, &credentials).await?;

        let ai = AiOrchestrator::for_endpoint(config.ai_service_url.as_deref(), config.ai_timeout)?;
        info!(
            remote_ai = ai.has_remote(),
            timeout_ms = config.ai_timeout.as_millis() as u64,
            "Initialised clinic API state"
        );

        Ok(Self::new(Arc::new(tokens), Arc::new(PgStore::new(pool)), ai))
    }

    /// Pipeline for routes that require a bearer token.
    pub fn authenticated(&self, schema: RouteSchema) -> Pipeline {
        Pipeline::builder()
            .stage(AuthGuard::new(Arc::clone(&self.tokens)))
            .validate(schema)
    }

    /// Pipeline for routes open to anonymous callers.
    pub fn public(&self, schema: RouteSchema) -> Pipeline {
        Pipeline::builder().validate(schema)
    }
}

//! `POST /auth/register` and `POST /auth/login`.

use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use serde::{Deserialize, Serialize};
use shared::models::User;
use shared::store::UserStore;
use shared::{error_response, json_response, ApiRequest, Error, IdentityClaims, Result};
use tracing::info;

use crate::router::{match_route, normalize_path, route_not_found};
use crate::{schemas, AppState};

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

pub async fn handle(state: &AppState, event: Request) -> Response<Body> {
    let path = normalize_path(event.uri().path()).to_string();
    info!("Auth request: {} {}", event.method(), path);

    if *event.method() != Method::POST {
        return error_response(&route_not_found());
    }

    if let Some(params) = match_route("/auth/register", &path) {
        let request = ApiRequest::from_lambda(&event, params);
        return state
            .public(schemas::register())
            .run(request, |req| register(state, req))
            .await;
    }

    if let Some(params) = match_route("/auth/login", &path) {
        let request = ApiRequest::from_lambda(&event, params);
        return state
            .public(schemas::login())
            .run(request, |req| login(state, req))
            .await;
    }

    error_response(&route_not_found())
}

fn token_for(state: &AppState, user: &User) -> Result<TokenResponse> {
    let claims = IdentityClaims::new(user.id.to_string(), user.email.clone());
    Ok(TokenResponse {
        token: state.tokens.issue(&claims)?,
    })
}

async fn register(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let creds: Credentials = req.body()?;

    let user = state
        .store
        .create_user(&creds.email, &creds.password)
        .await?
        .ok_or_else(|| Error::conflict("EMAIL_IN_USE", "Email is already registered"))?;

    info!("Registered user {}", user.id);
    json_response(201, &token_for(state, &user)?)
}

async fn login(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let creds: Credentials = req.body()?;

    let user = state
        .store
        .authenticate(&creds.email, &creds.password)
        .await?
        .ok_or_else(|| Error::domain(401, "INVALID_CREDENTIALS", "Invalid email or password"))?;

    json_response(200, &token_for(state, &user)?)
}

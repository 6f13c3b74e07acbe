//! Shared library for the clinic API Lambda functions.
//!
//! This crate holds the request pipeline (auth guard, validation gate, error
//! mapper), token handling, AI reply orchestration and the storage seams used
//! by every function.

pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod secrets;
pub mod store;
pub mod validation;

pub use ai::{AiOrchestrator, AiReply, AiRequest, PatientContext};
pub use auth::{AuthGuard, IdentityClaims, TokenService};
pub use config::Config;
pub use error::{Error, Result};
pub use http::{error_response, json_response, TypedError};
pub use pipeline::{ApiRequest, Pipeline, Stage};
pub use secrets::{get_database_credentials, get_secret, resolve_jwt_secret, DatabaseCredentials};
pub use store::Store;
pub use validation::{Field, RouteSchema, Schema};

//! Chat with the AI assistant about a patient.
//!
//! Endpoints:
//! - GET /patients/{id}/messages - Conversation history, oldest first
//! - POST /chat - Send a message and receive a reply

use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use serde::{Deserialize, Serialize};
use shared::ai::{AiRequest, PatientContext};
use shared::models::{Message, MessageRole, Patient};
use shared::store::{MessageStore, PatientStore};
use shared::{error_response, json_response, ApiRequest, Error, Result};
use tracing::info;
use uuid::Uuid;

use crate::router::{match_route, normalize_path, route_not_found};
use crate::{schemas, AppState};

#[derive(Debug, Deserialize)]
struct PatientParams {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    limit: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    patient_id: Uuid,
    message: String,
}

#[derive(Debug, Serialize)]
struct MessageList {
    items: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

pub async fn handle(state: &AppState, event: Request) -> Response<Body> {
    let path = normalize_path(event.uri().path()).to_string();
    info!("Chat request: {} {}", event.method(), path);

    if *event.method() == Method::GET {
        if let Some(params) = match_route("/patients/{id}/messages", &path) {
            let request = ApiRequest::from_lambda(&event, params);
            return state
                .authenticated(schemas::list_messages())
                .run(request, |req| list_messages(state, req))
                .await;
        }
    }

    if *event.method() == Method::POST {
        if let Some(params) = match_route("/chat", &path) {
            let request = ApiRequest::from_lambda(&event, params);
            return state
                .authenticated(schemas::send_chat())
                .run(request, |req| send(state, req))
                .await;
        }
    }

    error_response(&route_not_found())
}

async fn owned_patient(state: &AppState, owner: Uuid, id: Uuid) -> Result<Patient> {
    state
        .store
        .find_patient(owner, id)
        .await?
        .ok_or_else(|| Error::not_found("PATIENT_NOT_FOUND", "Patient not found"))
}

async fn list_messages(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let PatientParams { id } = req.params()?;
    let MessagesQuery { limit } = req.query()?;

    let patient = owned_patient(state, owner, id).await?;
    let items = state.store.list_messages(patient.id, limit).await?;

    json_response(200, &MessageList { items })
}

async fn send(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let ChatRequest {
        patient_id,
        message,
    } = req.body()?;

    let patient = owned_patient(state, owner, patient_id).await?;
    let patient_id = patient.id;

    let ai_request = AiRequest::new(
        message,
        Some(PatientContext {
            name: patient.name,
            medical_notes: patient.medical_notes,
        }),
    )?;

    state
        .store
        .append_message(patient_id, MessageRole::User, &ai_request.message)
        .await?;

    let reply = state.ai.generate(&ai_request).await?;
    info!(patient_id = %patient_id, source = ?reply.source(), "Generated chat reply");

    state
        .store
        .append_message(patient_id, MessageRole::Ai, reply.text())
        .await?;

    json_response(
        200,
        &ChatResponse {
            reply: reply.into_text(),
        },
    )
}

//! Patient CRUD.
//!
//! Endpoints:
//! - GET /patients - List the caller's patients, newest first
//! - POST /patients - Create a patient
//! - GET /patients/{id} - Get a single patient
//! - PUT /patients/{id} - Update a patient
//! - DELETE /patients/{id} - Delete a patient

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared::models::{NewPatient, Page, Patient, PatientChanges};
use shared::store::PatientStore;
use shared::{error_response, json_response, ApiRequest, Error, Result};
use tracing::info;
use uuid::Uuid;

use crate::router::{match_route, normalize_path, route_not_found};
use crate::{schemas, AppState};

#[derive(Debug, Deserialize)]
struct PatientParams {
    id: Uuid,
}

#[derive(Debug, Serialize)]
struct PatientPage {
    items: Vec<Patient>,
    page: i64,
    limit: i64,
    total: i64,
}

enum Op {
    List,
    Create,
    Get,
    Update,
    Delete,
}

fn resolve(method: &Method, path: &str) -> Option<(Op, BTreeMap<String, String>)> {
    if let Some(params) = match_route("/patients", path) {
        return match *method {
            Method::GET => Some((Op::List, params)),
            Method::POST => Some((Op::Create, params)),
            _ => None,
        };
    }

    if let Some(params) = match_route("/patients/{id}", path) {
        return match *method {
            Method::GET => Some((Op::Get, params)),
            Method::PUT => Some((Op::Update, params)),
            Method::DELETE => Some((Op::Delete, params)),
            _ => None,
        };
    }

    None
}

pub async fn handle(state: &AppState, event: Request) -> Response<Body> {
    let path = normalize_path(event.uri().path()).to_string();
    info!("Patients request: {} {}", event.method(), path);

    let Some((op, params)) = resolve(event.method(), &path) else {
        return error_response(&route_not_found());
    };
    let request = ApiRequest::from_lambda(&event, params);

    match op {
        Op::List => {
            state
                .authenticated(schemas::list_patients())
                .run(request, |req| list(state, req))
                .await
        }
        Op::Create => {
            state
                .authenticated(schemas::create_patient())
                .run(request, |req| create(state, req))
                .await
        }
        Op::Get => {
            state
                .authenticated(schemas::patient_by_id())
                .run(request, |req| get(state, req))
                .await
        }
        Op::Update => {
            state
                .authenticated(schemas::update_patient())
                .run(request, |req| update(state, req))
                .await
        }
        Op::Delete => {
            state
                .authenticated(schemas::patient_by_id())
                .run(request, |req| delete(state, req))
                .await
        }
    }
}

fn patient_not_found() -> Error {
    Error::not_found("PATIENT_NOT_FOUND", "Patient not found")
}

async fn list(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let page: Page = req.query()?;

    let (items, total) = state.store.list_patients(owner, page).await?;

    json_response(
        200,
        &PatientPage {
            items,
            page: page.page,
            limit: page.limit,
            total,
        },
    )
}

async fn create(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let input: NewPatient = req.body()?;

    let patient = state.store.create_patient(owner, input).await?;
    info!("Created patient {} for user {}", patient.id, owner);

    json_response(201, &patient)
}

async fn get(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let PatientParams { id } = req.params()?;

    let patient = state
        .store
        .find_patient(owner, id)
        .await?
        .ok_or_else(patient_not_found)?;

    json_response(200, &patient)
}

async fn update(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let PatientParams { id } = req.params()?;
    let changes = changes_from(req.body_fields()?)?;

    let patient = state
        .store
        .update_patient(owner, id, changes)
        .await?
        .ok_or_else(patient_not_found)?;

    json_response(200, &patient)
}

async fn delete(state: &AppState, req: ApiRequest) -> Result<Response<Body>> {
    let owner = req.identity()?.user_id()?;
    let PatientParams { id } = req.params()?;

    if !state.store.delete_patient(owner, id).await? {
        return Err(patient_not_found());
    }

    json_response(200, &json!({ "ok": true }))
}

/// Only keys present in the validated body become changes; an explicit
/// `medicalNotes: null` clears the notes.
fn changes_from(fields: &Map<String, Value>) -> Result<PatientChanges> {
    let text = |key: &str| fields.get(key).and_then(Value::as_str).map(String::from);

    let dob = fields
        .get("dob")
        .map(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()))
        .transpose()?;

    Ok(PatientChanges {
        name: text("name"),
        email: text("email"),
        phone: text("phone"),
        dob,
        medical_notes: fields
            .get("medicalNotes")
            .map(|v| v.as_str().map(String::from)),
    })
}

//! End-to-end handler tests against an in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_gateway::{routes, AppState};
use async_trait::async_trait;
use chrono::Utc;
use lambda_http::http::{header::AUTHORIZATION, Method};
use lambda_http::{Body, Request, RequestExt, Response};
use serde_json::{json, Value};
use shared::ai::ClinicTemplate;
use shared::models::{Message, MessageRole, NewPatient, Page, Patient, PatientChanges, User};
use shared::store::{MessageStore, PatientStore, UserStore};
use shared::{AiOrchestrator, Result, TokenService};
use uuid::Uuid;

#[derive(Default)]
struct MemoryStore {
    users: Mutex<Vec<(User, String)>>,
    patients: Mutex<Vec<Patient>>,
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, email: &str, password: &str) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u.email == email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        users.push((user.clone(), password.to_string()));
        Ok(Some(user))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(u, p)| u.email == email && p == password)
            .map(|(u, _)| u.clone()))
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn list_patients(&self, owner: Uuid, page: Page) -> Result<(Vec<Patient>, i64)> {
        let patients = self.patients.lock().unwrap();
        let mut owned: Vec<Patient> = patients.iter().filter(|p| p.user_id == owner).cloned().collect();
        owned.reverse();
        let total = owned.len() as i64;
        let items = owned
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn create_patient(&self, owner: Uuid, input: NewPatient) -> Result<Patient> {
        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            user_id: owner,
            name: input.name,
            email: input.email,
            phone: input.phone,
            dob: input.dob,
            medical_notes: input.medical_notes,
            created_at: now,
            updated_at: now,
        };
        self.patients.lock().unwrap().push(patient.clone());
        Ok(patient)
    }

    async fn find_patient(&self, owner: Uuid, id: Uuid) -> Result<Option<Patient>> {
        let patients = self.patients.lock().unwrap();
        Ok(patients.iter().find(|p| p.id == id && p.user_id == owner).cloned())
    }

    async fn update_patient(&self, owner: Uuid, id: Uuid, changes: PatientChanges) -> Result<Option<Patient>> {
        let mut patients = self.patients.lock().unwrap();
        let Some(patient) = patients.iter_mut().find(|p| p.id == id && p.user_id == owner) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            patient.name = name;
        }
        if let Some(email) = changes.email {
            patient.email = email;
        }
        if let Some(phone) = changes.phone {
            patient.phone = phone;
        }
        if let Some(dob) = changes.dob {
            patient.dob = dob;
        }
        if let Some(notes) = changes.medical_notes {
            patient.medical_notes = notes;
        }
        patient.updated_at = Utc::now();
        Ok(Some(patient.clone()))
    }

    async fn delete_patient(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let mut patients = self.patients.lock().unwrap();
        let before = patients.len();
        patients.retain(|p| !(p.id == id && p.user_id == owner));
        Ok(patients.len() != before)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(&self, patient_id: Uuid, role: MessageRole, content: &str) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            patient_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, patient_id: Uuid, limit: i64) -> Result<Vec<Message>> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.patient_id == patient_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

fn state() -> AppState {
    let tokens = TokenService::new("integration-test-secret", Duration::from_secs(3600)).unwrap();
    AppState::new(
        Arc::new(tokens),
        Arc::new(MemoryStore::default()),
        AiOrchestrator::local(Arc::new(ClinicTemplate)),
    )
}

fn event(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Request {
    let mut builder = lambda_http::http::Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::Empty,
    };
    builder.body(body).unwrap()
}

fn with_query(request: Request, pairs: &[(&str, &str)]) -> Request {
    let query: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    request.with_query_string_parameters(query)
}

fn json_of(response: &Response<Body>) -> Value {
    serde_json::from_slice(response.body().as_ref()).unwrap()
}

async fn register(state: &AppState, email: &str) -> String {
    let response = routes::auth::handle(
        state,
        event(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(response.status(), 201);
    json_of(&response)["token"].as_str().unwrap().to_string()
}

async fn create_patient(state: &AppState, token: &str, name: &str) -> Value {
    let response = routes::patients::handle(
        state,
        event(
            Method::POST,
            "/patients",
            Some(token),
            Some(json!({
                "name": name,
                "email": "sarah@example.com",
                "phone": "5551234567",
                "dob": "1990-04-12",
                "medicalNotes": "Sensitive molars"
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), 201);
    json_of(&response)
}

#[tokio::test]
async fn test_register_then_login() {
    let state = state();
    register(&state, "dr@clinic.com").await;

    let duplicate = routes::auth::handle(
        &state,
        event(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "dr@clinic.com", "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(duplicate.status(), 409);
    assert_eq!(json_of(&duplicate)["error"]["code"], "EMAIL_IN_USE");

    let login = routes::auth::handle(
        &state,
        event(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "dr@clinic.com", "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(login.status(), 200);
    let token = json_of(&login)["token"].as_str().unwrap().to_string();
    assert_eq!(state.tokens.verify(&token).unwrap().email, "dr@clinic.com");

    let wrong = routes::auth::handle(
        &state,
        event(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "dr@clinic.com", "password": "not-the-password" })),
        ),
    )
    .await;
    assert_eq!(wrong.status(), 401);
    assert_eq!(json_of(&wrong)["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_register_reports_every_violation() {
    let state = state();
    let response = routes::auth::handle(
        &state,
        event(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "nope", "password": "short" })),
        ),
    )
    .await;

    assert_eq!(response.status(), 400);
    let body = json_of(&response);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("body.email: Invalid email"));
    assert!(message.contains("body.password: String must contain at least 8 character(s)"));
}

#[tokio::test]
async fn test_non_bearer_header_is_unauthorized() {
    let state = state();
    let request = lambda_http::http::Request::builder()
        .method(Method::GET)
        .uri("/patients")
        .header(AUTHORIZATION, "Token abc")
        .body(Body::Empty)
        .unwrap();

    let response = routes::patients::handle(&state, request).await;

    assert_eq!(response.status(), 401);
    assert_eq!(
        json_of(&response)["error"],
        json!({ "code": "UNAUTHORIZED", "message": "Missing or invalid authorization header" })
    );
}

#[tokio::test]
async fn test_non_numeric_limit_is_rejected() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;

    let request = with_query(event(Method::GET, "/patients", Some(&token), None), &[("limit", "abc")]);
    let response = routes::patients::handle(&state, request).await;

    assert_eq!(response.status(), 400);
    assert_eq!(
        json_of(&response)["error"]["message"],
        "query.limit: Expected integer, received \"abc\""
    );
}

#[tokio::test]
async fn test_patient_crud() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;
    let created = create_patient(&state, &token, "Sarah Lee").await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["dob"], "1990-04-12T00:00:00Z");

    let list = routes::patients::handle(
        &state,
        with_query(event(Method::GET, "/patients", Some(&token), None), &[("limit", "5")]),
    )
    .await;
    let body = json_of(&list);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 5);

    let path = format!("/patients/{}", id);
    let updated = routes::patients::handle(
        &state,
        event(Method::PUT, &path, Some(&token), Some(json!({ "medicalNotes": null }))),
    )
    .await;
    assert_eq!(updated.status(), 200);
    assert_eq!(json_of(&updated)["medicalNotes"], Value::Null);

    let empty = routes::patients::handle(&state, event(Method::PUT, &path, Some(&token), Some(json!({})))).await;
    assert_eq!(empty.status(), 400);

    let deleted = routes::patients::handle(&state, event(Method::DELETE, &path, Some(&token), None)).await;
    assert_eq!(json_of(&deleted), json!({ "ok": true }));

    let gone = routes::patients::handle(&state, event(Method::GET, &path, Some(&token), None)).await;
    assert_eq!(gone.status(), 404);
    assert_eq!(json_of(&gone)["error"]["code"], "PATIENT_NOT_FOUND");
}

#[tokio::test]
async fn test_patients_are_isolated_between_users() {
    let state = state();
    let owner = register(&state, "owner@clinic.com").await;
    let other = register(&state, "other@clinic.com").await;
    let created = create_patient(&state, &owner, "Sarah Lee").await;
    let path = format!("/patients/{}", created["id"].as_str().unwrap());

    let response = routes::patients::handle(&state, event(Method::GET, &path, Some(&other), None)).await;
    assert_eq!(response.status(), 404);

    let list = routes::patients::handle(&state, event(Method::GET, "/patients", Some(&other), None)).await;
    assert_eq!(json_of(&list)["total"], 0);
}

#[tokio::test]
async fn test_chat_falls_back_and_records_conversation() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;
    let patient = create_patient(&state, &token, "Sarah Lee").await;
    let patient_id = patient["id"].as_str().unwrap().to_string();

    let response = routes::chat::handle(
        &state,
        event(
            Method::POST,
            "/chat",
            Some(&token),
            Some(json!({ "patientId": patient_id, "message": "My tooth hurts" })),
        ),
    )
    .await;
    assert_eq!(response.status(), 200);
    let reply = json_of(&response)["reply"].as_str().unwrap().to_string();
    assert!(reply.contains("Sarah Lee"));
    assert!(reply.contains("Sensitive molars"));

    let history = routes::chat::handle(
        &state,
        event(Method::GET, &format!("/patients/{}/messages", patient_id), Some(&token), None),
    )
    .await;
    let items = json_of(&history)["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["role"], "USER");
    assert_eq!(items[0]["content"], "My tooth hurts");
    assert_eq!(items[1]["role"], "AI");
    assert_eq!(items[1]["content"], reply.as_str());
}

#[tokio::test]
async fn test_chat_about_unknown_patient_is_not_found() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;

    let response = routes::chat::handle(
        &state,
        event(
            Method::POST,
            "/chat",
            Some(&token),
            Some(json!({ "patientId": Uuid::new_v4(), "message": "Hello" })),
        ),
    )
    .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let response = routes::health::handle(event(Method::GET, "/api/health", None, None)).await;
    assert_eq!(json_of(&response), json!({ "ok": true, "service": "api" }));

    let state = state();
    let missing = routes::patients::handle(&state, event(Method::GET, "/nowhere", None, None)).await;
    assert_eq!(missing.status(), 404);
    assert_eq!(
        json_of(&missing)["error"],
        json!({ "code": "NOT_FOUND", "message": "Route not found" })
    );
}

#[tokio::test]
async fn test_whitespace_chat_message_gets_a_reply() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;
    let patient = create_patient(&state, &token, "Sarah Lee").await;
    let patient_id = patient["id"].as_str().unwrap().to_string();

    let response = routes::chat::handle(
        &state,
        event(
            Method::POST,
            "/chat",
            Some(&token),
            Some(json!({ "patientId": patient_id, "message": "   " })),
        ),
    )
    .await;
    assert_eq!(response.status(), 200);
    assert!(json_of(&response)["reply"].as_str().unwrap().contains("Sarah Lee"));

    let history = routes::chat::handle(
        &state,
        event(Method::GET, &format!("/patients/{}/messages", patient_id), Some(&token), None),
    )
    .await;
    let roles: Vec<Value> = json_of(&history)["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].clone())
        .collect();
    assert_eq!(roles, vec![json!("USER"), json!("AI")]);
}

#[tokio::test]
async fn test_rejected_chat_stores_nothing() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;
    let patient = create_patient(&state, &token, "Sarah Lee").await;
    let patient_id = patient["id"].as_str().unwrap().to_string();

    let response = routes::chat::handle(
        &state,
        event(
            Method::POST,
            "/chat",
            Some(&token),
            Some(json!({ "patientId": patient_id, "message": "" })),
        ),
    )
    .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        json_of(&response)["error"]["message"],
        "body.message: String must contain at least 1 character(s)"
    );

    let history = routes::chat::handle(
        &state,
        event(Method::GET, &format!("/patients/{}/messages", patient_id), Some(&token), None),
    )
    .await;
    assert_eq!(json_of(&history)["items"], json!([]));
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let state = state();
    let token = register(&state, "dr@clinic.com").await;
    create_patient(&state, &token, "Sarah Lee").await;

    let request = with_query(
        event(Method::GET, "/patients", Some(&token), None),
        &[("page", "9223372036854775807"), ("limit", "100")],
    );
    let response = routes::patients::handle(&state, request).await;

    assert_eq!(response.status(), 200);
    let body = json_of(&response);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], json!(9_223_372_036_854_775_807_i64));
}

//! `POST /generate` and `GET /health`.

use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use serde::Serialize;
use serde_json::json;
use shared::ai::{AiRequest, MAX_MESSAGE_CHARS};
use shared::{error_response, json_response, AiOrchestrator, ApiRequest, Error, Field, Pipeline, Result, RouteSchema, Schema};
use tracing::info;

#[derive(Debug, Serialize)]
struct GenerateResponse {
    reply: String,
}

fn generate_schema() -> RouteSchema {
    RouteSchema::new().body(Schema::new(vec![
        Field::text("message").trim().length(1, MAX_MESSAGE_CHARS),
        Field::object(
            "patientContext",
            Schema::new(vec![
                Field::text("name").trim().length(1, 100),
                Field::text("medicalNotes").trim().optional().nullable(),
            ]),
        )
        .optional()
        .nullable(),
    ]))
}

fn path_of(event: &Request) -> &str {
    let path = event.uri().path().trim_end_matches('/');
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

pub async fn handle(ai: &AiOrchestrator, event: Request) -> Response<Body> {
    let request = ApiRequest::from_lambda(&event, Default::default());

    match (event.method(), path_of(&event)) {
        (&Method::POST, "/generate") => {
            Pipeline::builder()
                .validate(generate_schema())
                .run(request, |req| generate(ai, req))
                .await
        }
        (&Method::GET, "/health") => {
            Pipeline::builder()
                .validate(RouteSchema::new())
                .run(request, |_| async {
                    json_response(200, &json!({ "ok": true, "service": "ai-service" }))
                })
                .await
        }
        _ => error_response(&Error::not_found("NOT_FOUND", "Route not found")),
    }
}

async fn generate(ai: &AiOrchestrator, req: ApiRequest) -> Result<Response<Body>> {
    let payload: AiRequest = req.body()?;

    let reply = ai.generate(&payload).await?;
    info!(source = ?reply.source(), "Generated reply");

    json_response(
        200,
        &GenerateResponse {
            reply: reply.into_text(),
        },
    )
}

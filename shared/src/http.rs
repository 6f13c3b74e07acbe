//! HTTP helpers and the error mapper for Lambda functions.

use lambda_http::http::header::CONTENT_TYPE;
use lambda_http::http::{HeaderValue, StatusCode};
use lambda_http::{Body, Response};
use serde::Serialize;
use tracing::error;

use crate::{Error, Result};

/// Client-facing message for failures we do not describe.
pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

/// The only error shape that reaches a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedError {
    pub status_code: u16,
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl From<&Error> for TypedError {
    fn from(err: &Error) -> Self {
        let (code, message) = match err {
            Error::MissingToken | Error::InvalidToken => ("UNAUTHORIZED", err.to_string()),
            Error::Validation(_) => ("VALIDATION_ERROR", err.to_string()),
            Error::Domain { code, message, .. } => (*code, message.clone()),
            Error::AiUnavailable(_) => ("AI_UNAVAILABLE", "AI service unavailable".to_string()),
            _ => {
                error!(error = %err, "Unhandled error");
                ("INTERNAL_ERROR", INTERNAL_MESSAGE.to_string())
            }
        };

        Self {
            status_code: err.status_code(),
            code: code.to_string(),
            message,
        }
    }
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(|e| Error::Internal(format!("Failed to build response: {}", e)))
}

/// Map any error to `{"error": {"code", "message"}}` with its status.
pub fn error_response(err: &Error) -> Response<Body> {
    let typed = TypedError::from(err);
    typed_response(&typed)
}

fn typed_response(typed: &TypedError) -> Response<Body> {
    let envelope = ErrorEnvelope {
        error: ErrorBody {
            code: &typed.code,
            message: &typed.message,
        },
    };
    let body = serde_json::to_string(&envelope).unwrap_or_else(|_| {
        r#"{"error":{"code":"INTERNAL_ERROR","message":"An unexpected error occurred"}}"#.to_string()
    });

    let mut response = Response::new(Body::from(body));
    *response.status_mut() =
        StatusCode::from_u16(typed.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

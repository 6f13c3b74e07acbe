//! Error types for the clinic API.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere between the raw request and the response.
#[derive(Error, Debug)]
pub enum Error {
    /// Authorization header absent or not a `Bearer` credential
    #[error("Missing or invalid authorization header")]
    MissingToken,

    /// Bearer token failed signature, structure or expiry checks
    #[error("Invalid or expired token")]
    InvalidToken,

    /// One or more schema violations, in declaration order
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    /// Declared domain error, passed to the client unchanged
    #[error("{message}")]
    Domain {
        status: u16,
        code: &'static str,
        message: String,
    },

    /// Neither the remote AI provider nor the fallback produced a reply
    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a declared domain error.
    pub fn domain(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Error::Domain {
            status,
            code,
            message: message.into(),
        }
    }

    /// 404 with a resource-specific code.
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::domain(404, code, message)
    }

    /// 409 with a resource-specific code.
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::domain(409, code, message)
    }

    /// A single validation violation.
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Validation(vec![message.into()])
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingToken | Error::InvalidToken => 401,
            Error::Validation(_) => 400,
            Error::Domain { status, .. } => *status,
            Error::AiUnavailable(_) => 503,
            _ => 500,
        }
    }
}

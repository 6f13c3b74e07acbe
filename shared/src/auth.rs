//! JWT authentication: token issuance, verification and the bearer guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lambda_http::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::pipeline::{ApiRequest, Stage};
use crate::{Error, Result};

/// Shortest signing secret accepted at startup.
pub const MIN_SECRET_LEN: usize = 16;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Identity carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user id)
    pub sub: String,
    /// Email
    pub email: String,
}

impl IdentityClaims {
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
        }
    }

    /// Subject parsed as the owning user's id.
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| Error::InvalidToken)
    }
}

/// Wire form of the token payload.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    email: String,
    /// Issued at
    iat: i64,
    /// Expiration
    exp: i64,
}

/// Issues and verifies HS256 identity tokens.
///
/// Construction is the only fallible configuration step; once built, `issue`
/// and `verify` perform no I/O and hold no mutable state.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service, rejecting secrets shorter than [`MIN_SECRET_LEN`].
    pub fn new(secret: &str, ttl: Duration) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "JWT secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    /// Sign `claims`, expiring after the configured duration.
    pub fn issue(&self, claims: &IdentityClaims) -> Result<String> {
        self.issue_at(claims, Utc::now().timestamp())
    }

    fn issue_at(&self, claims: &IdentityClaims, issued_at: i64) -> Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| Error::Config("token expiry is out of range".to_string()))?;

        let payload = TokenClaims {
            sub: claims.sub.clone(),
            email: claims.email.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl),
        };

        encode(&Header::new(ALGORITHM), &payload, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature, structure and expiry, returning the embedded identity.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| Error::InvalidToken)?;

        let TokenClaims { sub, email, .. } = data.claims;
        if sub.trim().is_empty() || email.trim().is_empty() {
            return Err(Error::InvalidToken);
        }

        Ok(IdentityClaims { sub, email })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Pipeline stage that requires a valid bearer token.
#[derive(Clone)]
pub struct AuthGuard {
    tokens: Arc<TokenService>,
}

impl AuthGuard {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl Stage for AuthGuard {
    fn name(&self) -> &'static str {
        "auth_guard"
    }

    fn apply(&self, mut request: ApiRequest) -> Result<ApiRequest> {
        let Some(token) = bearer_token(request.headers()) else {
            warn!(path = %request.path(), "rejecting request without bearer token");
            return Err(Error::MissingToken);
        };

        match self.tokens.verify(token) {
            Ok(claims) => {
                request.attach_identity(claims);
                Ok(request)
            }
            Err(e) => {
                warn!(path = %request.path(), "rejecting bearer token: {}", e);
                Err(Error::InvalidToken)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::http::HeaderValue;

    const SECRET: &str = "a-very-long-test-secret";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::from_secs(3600)).unwrap()
    }

    #[test]
    fn test_issue_then_verify_returns_same_claims() {
        let tokens = service();
        let claims = IdentityClaims::new("u1", "a@b.com");

        let token = tokens.issue(&claims).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_short_secret_rejected_at_construction() {
        let result = TokenService::new("too-short", Duration::from_secs(60));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new(SECRET, Duration::from_secs(60)).unwrap();
        let claims = IdentityClaims::new("u1", "a@b.com");
        let two_hours_ago = Utc::now().timestamp() - 7200;

        let token = tokens.issue_at(&claims, two_hours_ago).unwrap();
        assert!(matches!(tokens.verify(&token), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenService::new("another-long-secret-value", Duration::from_secs(60)).unwrap();
        let token = other.issue(&IdentityClaims::new("u1", "a@b.com")).unwrap();

        assert!(matches!(service().verify(&token), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(service().verify("not.a.jwt"), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let tokens = service();
        let token = tokens.issue(&IdentityClaims::new("", "a@b.com")).unwrap();
        assert!(matches!(tokens.verify(&token), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}

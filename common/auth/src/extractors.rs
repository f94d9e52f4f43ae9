use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue};
use serde::Serialize;
use uuid::Uuid;

use crate::claims::ValidationResult;
use crate::error::{AuthError, AuthResult};

pub const TRACE_ID_HEADER: &str = "X-Trace-ID";

/// Identity published by the gate for the current request only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user: u64,
    pub role: String,
    pub mfa: bool,
}

impl From<&ValidationResult> for AuthContext {
    fn from(result: &ValidationResult) -> Self {
        Self {
            user: result.user_id,
            role: result.role.clone(),
            mfa: result.mfa_satisfied,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingContext)
    }
}

/// Pulls the bearer credential out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<String> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::InvalidToken("authorization header missing".into()))?;
    parse_bearer(value)
}

fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("authorization header is not ascii".into()))?
        .trim();

    let (scheme, token) = raw
        .split_once(' ')
        .ok_or_else(|| AuthError::InvalidToken("authorization header malformed".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken("authorization scheme is not bearer".into()));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken("bearer token empty".into()));
    }

    Ok(token.to_owned())
}

pub fn trace_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

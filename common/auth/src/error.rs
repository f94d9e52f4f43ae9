use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

pub type AuthResult<T> = Result<T, AuthError>;

pub const CODE_INVALID_TOKEN: &str = "invalid_token";
pub const CODE_2FA_REQUIRED: &str = "2fa_required";
pub const CODE_INSUFFICIENT_PERMISSIONS: &str = "insufficient_role_permissions";
pub const CODE_SERVICE_UNAVAILABLE: &str = "service_unavailable";
pub const CODE_CONTEXT_MISSING: &str = "auth_context_missing";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid access token: {0}")]
    InvalidToken(String),
    #[error("session has already completed two-factor authentication")]
    TwoFactorRequired,
    #[error("role '{role}' is not permitted for this route")]
    InsufficientPermissions { role: String },
    #[error("identity service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("auth context missing; route is not guarded")]
    MissingContext,
}

impl AuthError {
    /// Stable failure code exposed to clients and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidToken(_) => CODE_INVALID_TOKEN,
            AuthError::TwoFactorRequired => CODE_2FA_REQUIRED,
            AuthError::InsufficientPermissions { .. } => CODE_INSUFFICIENT_PERMISSIONS,
            AuthError::ServiceUnavailable(_) => CODE_SERVICE_UNAVAILABLE,
            AuthError::MissingContext => CODE_CONTEXT_MISSING,
        }
    }

    /// Upstream detail (transport errors, parse errors) stays in logs; only
    /// the code reaches the client.
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            AuthError::InvalidToken(_) => ApiError::unauthorized(CODE_INVALID_TOKEN, trace_id),
            AuthError::TwoFactorRequired => ApiError::unauthorized(CODE_2FA_REQUIRED, trace_id),
            AuthError::InsufficientPermissions { .. } => {
                ApiError::forbidden(CODE_INSUFFICIENT_PERMISSIONS, trace_id)
            }
            AuthError::ServiceUnavailable(_) => ApiError::service_unavailable(trace_id),
            AuthError::MissingContext => ApiError::internal(CODE_CONTEXT_MISSING, trace_id),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.into_api_error(None).into_response()
    }
}

use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};

use crate::validation::{Validate, ValidatedJson};

pub async fn health() -> &'static str {
    "ok"
}

pub async fn me(auth: AuthContext) -> Json<AuthContext> {
    Json(auth)
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub pong: bool,
    pub user: u64,
    pub role: String,
}

pub async fn admin_ping(auth: AuthContext) -> Json<PingResponse> {
    Json(PingResponse {
        pong: true,
        user: auth.user,
        role: auth.role,
    })
}

#[derive(Debug, Deserialize)]
pub struct ConfirmTwoFactorRequest {
    pub code: String,
}

impl Validate for ConfirmTwoFactorRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let code = self.code.trim();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::bad_request("invalid_2fa_code", None)
                .with_message("code must be 6 digits"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmTwoFactorResponse {
    pub user: u64,
    pub mfa: bool,
}

/// Reachable only before the session has completed MFA. The code itself is
/// checked by the users service; this endpoint only accepts it.
pub async fn confirm_2fa(
    auth: AuthContext,
    ValidatedJson(body): ValidatedJson<ConfirmTwoFactorRequest>,
) -> (StatusCode, Json<ConfirmTwoFactorResponse>) {
    tracing::info!(user = auth.user, code_len = body.code.trim().len(), "2fa confirmation received");
    (
        StatusCode::ACCEPTED,
        Json(ConfirmTwoFactorResponse {
            user: auth.user,
            mfa: auth.mfa,
        }),
    )
}

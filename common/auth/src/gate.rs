use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use common_observability::AuthGateMetrics;
use tracing::debug;

use crate::claims::{ValidationRequest, ValidationResult};
use crate::client::{CallContext, ServiceClient};
use crate::config::GateConfig;
use crate::error::{AuthError, AuthResult};
use crate::extractors::{bearer_token, AuthContext};
use crate::layer::AuthGuardLayer;
use crate::policy::AuthPolicy;

/// Progress of a single request through the gate. A rejection records the
/// last stage that was reached before the failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Start,
    TokenExtracted,
    Validated,
    PolicyChecked,
    Handled,
}

impl GateStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStage::Start => "start",
            GateStage::TokenExtracted => "token_extracted",
            GateStage::Validated => "validated",
            GateStage::PolicyChecked => "policy_checked",
            GateStage::Handled => "handled",
        }
    }
}

#[derive(Debug)]
pub struct GateRejection {
    pub stage: GateStage,
    pub error: AuthError,
}

impl GateRejection {
    fn at(stage: GateStage, error: AuthError) -> Self {
        Self { stage, error }
    }

    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        self.error.into_response()
    }
}

struct GateInner {
    config: GateConfig,
    service: String,
    client: Arc<dyn ServiceClient>,
    metrics: Option<Arc<AuthGateMetrics>>,
}

/// Validates bearer tokens against the identity service and applies route
/// policy. Holds no per-request state; clones share the same client.
#[derive(Clone)]
pub struct AuthGate {
    inner: Arc<GateInner>,
}

impl AuthGate {
    pub fn new(config: GateConfig, client: Arc<dyn ServiceClient>) -> Self {
        Self::build(config, client, None)
    }

    pub fn with_metrics(self, metrics: Arc<AuthGateMetrics>) -> Self {
        Self::build(
            self.inner.config.clone(),
            self.inner.client.clone(),
            Some(metrics),
        )
    }

    fn build(
        config: GateConfig,
        client: Arc<dyn ServiceClient>,
        metrics: Option<Arc<AuthGateMetrics>>,
    ) -> Self {
        let service = config.http_service_name();
        Self {
            inner: Arc::new(GateInner {
                config,
                service,
                client,
                metrics,
            }),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    /// Wraps a handler so it only runs for requests admitted under `policy`.
    pub fn guard(&self, policy: AuthPolicy) -> AuthGuardLayer {
        AuthGuardLayer::new(self.clone(), policy)
    }

    /// Extract, validate, then check MFA and role, stopping at the first failure.
    pub async fn authorize(
        &self,
        policy: &AuthPolicy,
        headers: &HeaderMap,
        call: &CallContext,
    ) -> Result<AuthContext, GateRejection> {
        let token =
            bearer_token(headers).map_err(|err| GateRejection::at(GateStage::Start, err))?;

        let body = serde_json::to_vec(&ValidationRequest {
            access_token: &token,
        })
        .map_err(|err| {
            GateRejection::at(
                GateStage::TokenExtracted,
                AuthError::ServiceUnavailable(format!("encode validation request: {err}")),
            )
        })?;

        let result = self
            .validate(call, body)
            .await
            .map_err(|err| GateRejection::at(GateStage::TokenExtracted, err))?;

        policy
            .check(&result)
            .map_err(|err| GateRejection::at(GateStage::Validated, err))?;

        debug!(
            session_id = %result.session_id,
            user = result.user_id,
            role = %result.role,
            "token validated"
        );
        Ok(AuthContext::from(&result))
    }

    async fn validate(&self, call: &CallContext, body: Vec<u8>) -> AuthResult<ValidationResult> {
        let started = Instant::now();
        let response = self
            .inner
            .client
            .post(call, &self.inner.service, &self.inner.config.validate_path, body)
            .await;
        if let Some(metrics) = &self.inner.metrics {
            metrics.observe_identity_call(started.elapsed().as_secs_f64());
        }

        let response = response.map_err(|err| AuthError::ServiceUnavailable(err.to_string()))?;
        match response.status {
            StatusCode::OK => serde_json::from_slice(&response.body).map_err(|err| {
                AuthError::ServiceUnavailable(format!("malformed validation response: {err}"))
            }),
            StatusCode::BAD_REQUEST => Err(AuthError::InvalidToken(
                "rejected by identity service".into(),
            )),
            other => Err(AuthError::ServiceUnavailable(format!(
                "identity service returned {other}"
            ))),
        }
    }

    pub(crate) fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_decision(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ServiceResponse, TransportError};
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use std::sync::Mutex;

    struct Recorded {
        service: String,
        path: String,
        body: Vec<u8>,
    }

    struct StubClient {
        reply: Box<dyn Fn() -> Result<ServiceResponse, TransportError> + Send + Sync>,
        calls: Mutex<Vec<Recorded>>,
    }

    impl StubClient {
        fn replying(status: StatusCode, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(move || Ok(ServiceResponse::new(status, body))),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(|| Err(TransportError::Request("connection refused".into()))),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ServiceClient for StubClient {
        async fn post(
            &self,
            _call: &CallContext,
            service: &str,
            path: &str,
            body: Vec<u8>,
        ) -> Result<ServiceResponse, TransportError> {
            self.calls.lock().unwrap().push(Recorded {
                service: service.to_string(),
                path: path.to_string(),
                body,
            });
            (self.reply)()
        }
    }

    const ADMIN_BODY: &str = r#"{"id":"s1","user":42,"role":"admin","mfa":false,"expires":2000,"issued":1000,"issuer":"users","audience":["api"]}"#;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn gate(client: Arc<StubClient>) -> AuthGate {
        AuthGate::new(GateConfig::new("users"), client)
    }

    #[tokio::test]
    async fn missing_token_never_dials() {
        let client = StubClient::replying(StatusCode::OK, ADMIN_BODY);
        let rejection = gate(client.clone())
            .authorize(&AuthPolicy::authenticated(), &HeaderMap::new(), &CallContext::new())
            .await
            .expect_err("no token");
        assert_eq!(rejection.stage, GateStage::Start);
        assert_eq!(rejection.code(), "invalid_token");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn posts_token_to_users_http_validate_path() {
        let client = StubClient::replying(StatusCode::OK, ADMIN_BODY);
        let ctx = gate(client.clone())
            .authorize(&AuthPolicy::authenticated(), &bearer("good"), &CallContext::new())
            .await
            .expect("admitted");
        assert_eq!(ctx, AuthContext { user: 42, role: "admin".into(), mfa: false });

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].service, "users-http");
        assert_eq!(calls[0].path, "/users/auth/token/validate");
        let sent: serde_json::Value = serde_json::from_slice(&calls[0].body).unwrap();
        assert_eq!(sent, serde_json::json!({ "access_token": "good" }));
    }

    #[tokio::test]
    async fn custom_validate_path_is_used() {
        let client = StubClient::replying(StatusCode::OK, ADMIN_BODY);
        let config = GateConfig::new("identity").with_validate_path("/v2/tokens/check");
        AuthGate::new(config, client.clone())
            .authorize(&AuthPolicy::authenticated(), &bearer("good"), &CallContext::new())
            .await
            .expect("admitted");

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].service, "identity-http");
        assert_eq!(calls[0].path, "/v2/tokens/check");
    }

    #[tokio::test]
    async fn null_audience_and_issuer_are_admitted() {
        let body = r#"{"id":"s","user":1,"role":"admin","mfa":false,"expires":2000,"issued":1000,"issuer":"users","audience":null}"#;
        let ctx = gate(StubClient::replying(StatusCode::OK, body))
            .authorize(&AuthPolicy::authenticated(), &bearer("good"), &CallContext::new())
            .await
            .expect("admitted");
        assert_eq!(ctx, AuthContext { user: 1, role: "admin".into(), mfa: false });

        let body = r#"{"id":"s","user":2,"role":"viewer","mfa":true,"expires":2000,"issued":1000,"issuer":null,"audience":null}"#;
        let ctx = gate(StubClient::replying(StatusCode::OK, body))
            .authorize(&AuthPolicy::authenticated(), &bearer("good"), &CallContext::new())
            .await
            .expect("admitted");
        assert_eq!(ctx, AuthContext { user: 2, role: "viewer".into(), mfa: true });
    }

    #[tokio::test]
    async fn bad_request_from_identity_is_invalid_token() {
        let client = StubClient::replying(StatusCode::BAD_REQUEST, "{\"error\":\"expired\"}");
        let rejection = gate(client)
            .authorize(&AuthPolicy::authenticated(), &bearer("abc"), &CallContext::new())
            .await
            .expect_err("rejected");
        assert_eq!(rejection.stage, GateStage::TokenExtracted);
        assert!(matches!(rejection.error, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn other_statuses_are_service_unavailable() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::NO_CONTENT,
        ] {
            let client = StubClient::replying(status, ADMIN_BODY);
            let rejection = gate(client)
                .authorize(&AuthPolicy::authenticated(), &bearer("abc"), &CallContext::new())
                .await
                .expect_err("rejected");
            assert_eq!(rejection.code(), "service_unavailable", "status {status}");
        }
    }

    #[tokio::test]
    async fn malformed_ok_body_is_service_unavailable() {
        let client = StubClient::replying(StatusCode::OK, "{\"user\":\"not-a-number\"}");
        let rejection = gate(client)
            .authorize(&AuthPolicy::authenticated(), &bearer("abc"), &CallContext::new())
            .await
            .expect_err("rejected");
        assert!(matches!(rejection.error, AuthError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_service_unavailable() {
        let rejection = gate(StubClient::failing())
            .authorize(&AuthPolicy::authenticated(), &bearer("abc"), &CallContext::new())
            .await
            .expect_err("rejected");
        assert_eq!(rejection.stage, GateStage::TokenExtracted);
        assert_eq!(rejection.code(), "service_unavailable");
    }

    #[tokio::test]
    async fn policy_failures_are_reported_after_validation() {
        let client = StubClient::replying(StatusCode::OK, ADMIN_BODY);
        let rejection = gate(client)
            .authorize(&AuthPolicy::with_roles(["viewer"]), &bearer("good"), &CallContext::new())
            .await
            .expect_err("rejected");
        assert_eq!(rejection.stage, GateStage::Validated);
        assert_eq!(rejection.code(), "insufficient_role_permissions");
    }

    #[tokio::test]
    async fn metrics_observe_identity_calls() {
        let metrics = Arc::new(AuthGateMetrics::new());
        let client = StubClient::replying(StatusCode::OK, ADMIN_BODY);
        let gate = gate(client).with_metrics(metrics.clone());
        gate.authorize(&AuthPolicy::authenticated(), &bearer("good"), &CallContext::new())
            .await
            .expect("admitted");
        assert_eq!(metrics.identity_call_seconds.get_sample_count(), 1);
    }
}

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use common_auth::{AuthGate, AuthPolicy, CallContext, MeshClient};
use common_observability::AuthGateMetrics;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::handlers::{admin_ping, confirm_2fa, health, me};

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<AuthGateMetrics>,
}

/// Builds the gate against the configured mesh.
pub fn build_gate(config: &ServiceConfig, metrics: Arc<AuthGateMetrics>) -> AuthGate {
    let client = MeshClient::new(Arc::new(config.mesh.clone()));
    AuthGate::new(config.gate_config(), Arc::new(client)).with_metrics(metrics)
}

pub fn build_router(config: &ServiceConfig, gate: &AuthGate, state: AppState) -> Router {
    let any_role = gate.guard(AuthPolicy::authenticated());
    let admin = gate.guard(AuthPolicy::with_roles(config.admin_roles.iter().cloned()));
    let pre_mfa = gate.guard(AuthPolicy::new(true, Vec::<String>::new()));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/me", get(me).layer(any_role))
        .route("/admin/ping", get(admin_ping).layer(admin))
        .route("/auth/2fa/confirm", post(confirm_2fa).layer(pre_mfa))
        .with_state(state)
        .layer(middleware::from_fn_with_state(config.request_timeout, request_deadline))
        .layer(TraceLayer::new_for_http())
}

/// Gives every request a cancellation/deadline context for outbound calls.
async fn request_deadline(
    State(timeout): State<Duration>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let call = CallContext::with_timeout(timeout);
    // Outbound calls still in flight are cancelled once this request ends.
    let _guard = call.cancellation().clone().drop_guard();
    request.extensions_mut().insert(call);
    next.run(request).await
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather_text(),
    )
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use common_observability::OUTCOME_ALLOWED;
use tower::{Layer, Service};
use tracing::{debug, trace, warn};

use crate::client::CallContext;
use crate::extractors::{trace_id_from_headers, AuthContext};
use crate::gate::{AuthGate, GateStage};
use crate::policy::AuthPolicy;

/// Layer produced by [`AuthGate::guard`].
///
/// ```ignore
/// let admin = gate.guard(AuthPolicy::with_roles(["admin"]));
/// router = router.route("/admin/ping", get(ping).layer(admin));
/// ```
#[derive(Clone)]
pub struct AuthGuardLayer {
    gate: AuthGate,
    policy: Arc<AuthPolicy>,
}

impl AuthGuardLayer {
    pub(crate) fn new(gate: AuthGate, policy: AuthPolicy) -> Self {
        Self {
            gate,
            policy: Arc::new(policy),
        }
    }
}

impl<S> Layer<S> for AuthGuardLayer {
    type Service = AuthGuardService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGuardService {
            inner,
            gate: self.gate.clone(),
            policy: self.policy.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthGuardService<S> {
    inner: S,
    gate: AuthGate,
    policy: Arc<AuthPolicy>,
}

impl<S> Service<Request<Body>> for AuthGuardService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let policy = self.policy.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            // Identity must come from this request's validation only.
            request.extensions_mut().remove::<AuthContext>();

            let trace_id = trace_id_from_headers(request.headers());
            let call = request
                .extensions()
                .get::<CallContext>()
                .map(CallContext::child)
                .unwrap_or_default()
                .bounded_by(gate.config().call_timeout);

            let outcome = gate.authorize(&policy, request.headers(), &call).await;
            match outcome {
                Ok(auth) => {
                    gate.record(OUTCOME_ALLOWED);
                    debug!(
                        user = auth.user,
                        role = %auth.role,
                        mfa = auth.mfa,
                        stage = GateStage::PolicyChecked.as_str(),
                        "auth gate admitted request"
                    );
                    request.extensions_mut().insert(auth);
                    let response = ready_inner.call(request).await;
                    trace!(stage = GateStage::Handled.as_str(), "guarded handler finished");
                    response
                }
                Err(rejection) => {
                    gate.record(rejection.code());
                    warn!(
                        stage = rejection.stage.as_str(),
                        code = rejection.code(),
                        trace_id = ?trace_id,
                        error = %rejection.error,
                        "auth gate rejected request"
                    );
                    Ok(rejection.error.into_api_error(trace_id).into_response())
                }
            }
        })
    }
}

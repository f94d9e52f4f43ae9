#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use common_auth::{CallContext, ServiceClient, ServiceResponse, TransportError};

pub fn validation_body(user: u64, role: &str, mfa: bool) -> String {
    serde_json::json!({
        "id": format!("sess-{user}"),
        "user": user,
        "role": role,
        "mfa": mfa,
        "expires": 1_900_000_000i64,
        "issued": 1_800_000_000i64,
        "issuer": "users",
        "audience": ["resource-service"]
    })
    .to_string()
}

/// Reply for a session with no audience; the users service writes it as `null`.
pub fn null_audience_body(user: u64, role: &str, mfa: bool) -> String {
    serde_json::json!({
        "id": format!("sess-{user}"),
        "user": user,
        "role": role,
        "mfa": mfa,
        "expires": 1_900_000_000i64,
        "issued": 1_800_000_000i64,
        "issuer": "users",
        "audience": null
    })
    .to_string()
}

/// Identity service double that answers every call with the same reply.
pub struct StubIdentity {
    reply: Mutex<Result<(StatusCode, String), String>>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

impl StubIdentity {
    pub fn replying(status: StatusCode, body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Ok((status, body.into()))),
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Err("connection refused".into())),
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceClient for StubIdentity {
    async fn post(
        &self,
        _call: &CallContext,
        _service: &str,
        _path: &str,
        body: Vec<u8>,
    ) -> Result<ServiceResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sent: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        if let Some(token) = sent["access_token"].as_str() {
            self.tokens.lock().unwrap().push(token.to_string());
        }
        match &*self.reply.lock().unwrap() {
            Ok((status, body)) => Ok(ServiceResponse::new(*status, body.clone())),
            Err(detail) => Err(TransportError::Request(detail.clone())),
        }
    }
}

/// Never answers; only the call context can end the request.
pub struct HangingIdentity;

#[async_trait]
impl ServiceClient for HangingIdentity {
    async fn post(
        &self,
        call: &CallContext,
        _service: &str,
        _path: &str,
        _body: Vec<u8>,
    ) -> Result<ServiceResponse, TransportError> {
        call.run(std::future::pending::<ServiceResponse>()).await
    }
}

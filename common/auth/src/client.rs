use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("service '{0}' could not be resolved")]
    Discovery(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("deadline exceeded")]
    Timeout,
    #[error("caller cancelled the request")]
    Cancelled,
}

/// Cancellation and deadline of the inbound request, handed to every
/// outbound call made on its behalf.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derived context, cancelled when `self` is. Cancelling the child does
    /// not affect the parent.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
        }
    }

    /// Tightens the deadline to at most `timeout` from now.
    pub fn bounded_by(mut self, timeout: Option<Duration>) -> Self {
        if let Some(timeout) = timeout {
            let candidate = Instant::now() + timeout;
            self.deadline = Some(match self.deadline {
                Some(existing) if existing < candidate => existing,
                _ => candidate,
            });
        }
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drives `fut` until it completes, the deadline passes, or the context
    /// is cancelled. The losing future is dropped.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, TransportError>
    where
        F: Future,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| TransportError::Timeout),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(TransportError::Cancelled),
            out = bounded => out,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ServiceResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Service-to-service transport. Implementations resolve `service` through
/// whatever discovery the mesh uses and must honour `call`.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn post(
        &self,
        call: &CallContext,
        service: &str,
        path: &str,
        body: Vec<u8>,
    ) -> Result<ServiceResponse, TransportError>;
}

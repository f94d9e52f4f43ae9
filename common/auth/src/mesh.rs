use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use reqwest::Client;

use crate::client::{CallContext, ServiceClient, ServiceResponse, TransportError};

/// Maps a logical service name to a base URL.
pub trait ServiceResolver: Send + Sync {
    fn resolve(&self, service: &str) -> Option<String>;
}

/// Fixed name → base URL table, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    services: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.insert(name, base_url);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, base_url: impl Into<String>) {
        let base = base_url.into();
        self.services
            .insert(name.into(), base.trim_end_matches('/').to_string());
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceResolver for StaticResolver {
    fn resolve(&self, service: &str) -> Option<String> {
        self.services.get(service).cloned()
    }
}

/// reqwest-backed [`ServiceClient`]. No retries; a failed call surfaces as-is.
#[derive(Clone)]
pub struct MeshClient {
    client: Client,
    resolver: Arc<dyn ServiceResolver>,
}

impl MeshClient {
    pub fn new(resolver: Arc<dyn ServiceResolver>) -> Self {
        Self {
            client: Client::new(),
            resolver,
        }
    }

    pub fn with_client(client: Client, resolver: Arc<dyn ServiceResolver>) -> Self {
        Self { client, resolver }
    }

    pub fn url(&self, service: &str, path: &str) -> Result<String, TransportError> {
        let base = self
            .resolver
            .resolve(service)
            .ok_or_else(|| TransportError::Discovery(service.to_string()))?;
        Ok(format!("{base}{path}"))
    }
}

#[async_trait]
impl ServiceClient for MeshClient {
    async fn post(
        &self,
        call: &CallContext,
        service: &str,
        path: &str,
        body: Vec<u8>,
    ) -> Result<ServiceResponse, TransportError> {
        let url = self.url(service, path)?;
        let request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(body);

        call.run(async move {
            let response = request
                .send()
                .await
                .map_err(|err| TransportError::Request(err.to_string()))?;
            let status = StatusCode::from_u16(response.status().as_u16())
                .map_err(|err| TransportError::Request(err.to_string()))?;
            let body = response
                .bytes()
                .await
                .map_err(|err| TransportError::Request(err.to_string()))?;
            Ok::<_, TransportError>(ServiceResponse { status, body })
        })
        .await?
    }
}

use std::sync::Arc;

use common_observability::AuthGateMetrics;
use resource_service::{build_gate, build_router, AppState, ServiceConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;
    let gate_config = config.gate_config();
    if config.mesh.is_empty() {
        warn!("MESH_SERVICES is empty; every guarded request will fail with service_unavailable");
    }

    let metrics = Arc::new(AuthGateMetrics::new());
    let gate = build_gate(&config, metrics.clone());
    let app = build_router(&config, &gate, AppState { metrics });

    info!(
        addr = %config.addr,
        identity = %gate_config.http_service_name(),
        admin_roles = ?config.admin_roles,
        "starting resource-service"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

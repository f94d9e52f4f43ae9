use anyhow::{anyhow, Context, Result};
use common_auth::{GateConfig, StaticResolver};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub users_service: String,
    pub mesh: StaticResolver,
    pub validate_timeout: Duration,
    pub request_timeout: Duration,
    pub admin_roles: Vec<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(value) => parse_port(&value)?,
            Err(_) => 8090,
        };
        let ip: std::net::IpAddr = host.parse().context("HOST must be an IP address")?;
        let addr = SocketAddr::from((ip, port));

        let users_service = env::var("USERS_SERVICE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "users".to_string());

        let mesh = env::var("MESH_SERVICES")
            .ok()
            .map(|value| parse_mesh_services(&value))
            .transpose()
            .context("Failed to parse MESH_SERVICES")?
            .unwrap_or_default();

        let validate_timeout = millis_from_env("AUTH_VALIDATE_TIMEOUT_MS")?.unwrap_or(5_000);
        let request_timeout = millis_from_env("REQUEST_TIMEOUT_MS")?.unwrap_or(15_000);

        let admin_roles = env::var("ADMIN_ROLES")
            .ok()
            .map(|value| parse_roles(&value))
            .filter(|roles| !roles.is_empty())
            .unwrap_or_else(|| vec!["admin".to_string()]);

        Ok(Self {
            addr,
            users_service,
            mesh,
            validate_timeout: Duration::from_millis(validate_timeout.max(1)),
            request_timeout: Duration::from_millis(request_timeout.max(1)),
            admin_roles,
        })
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig::new(self.users_service.clone()).with_call_timeout(Some(self.validate_timeout))
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .with_context(|| format!("PORT must be a port number, got '{value}'"))
}

fn millis_from_env(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| anyhow!("{key} must be milliseconds: {err}")),
        Err(_) => Ok(None),
    }
}

/// `users-http=http://users:8085,orders-http=http://orders:8084`
pub fn parse_mesh_services(value: &str) -> Result<StaticResolver> {
    let mut resolver = StaticResolver::new();
    for item in value.split(|c| c == ',' || c == ';') {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (name, url) = trimmed
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid mesh entry '{trimmed}', expected name=url"))?;
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("Invalid mesh entry '{trimmed}', expected name=http(s)://host"));
        }
        resolver.insert(name, url);
    }
    Ok(resolver)
}

/// Role names are kept as written; the identity service is case-sensitive.
pub fn parse_roles(value: &str) -> Vec<String> {
    let mut roles: Vec<String> = value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect();
    roles.sort();
    roles.dedup();
    roles
}

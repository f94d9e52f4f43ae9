use std::time::Duration;

pub const DEFAULT_VALIDATE_PATH: &str = "/users/auth/token/validate";

/// Where the gate sends token validation requests and how long it waits.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Logical name of the users service; the HTTP endpoint is registered as `<name>-http`.
    pub users_service: String,
    pub validate_path: String,
    /// Upper bound on a single validation call. The inbound request's own
    /// deadline still applies when it is tighter.
    pub call_timeout: Option<Duration>,
}

impl GateConfig {
    /// Defaults: standard validate path, 5 second call timeout.
    pub fn new(users_service: impl Into<String>) -> Self {
        Self {
            users_service: users_service.into(),
            validate_path: DEFAULT_VALIDATE_PATH.to_string(),
            call_timeout: Some(Duration::from_secs(5)),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_validate_path(mut self, path: impl Into<String>) -> Self {
        self.validate_path = path.into();
        self
    }

    pub fn http_service_name(&self) -> String {
        format!("{}-http", self.users_service)
    }
}

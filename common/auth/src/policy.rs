use std::collections::BTreeSet;

use crate::claims::ValidationResult;
use crate::error::{AuthError, AuthResult};

/// Per-route gate configuration, fixed when the route is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPolicy {
    require_mfa: bool,
    allowed_roles: BTreeSet<String>,
}

impl AuthPolicy {
    /// Any authenticated role, no MFA restriction.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// `require_mfa` marks a pre-MFA route: sessions that already completed
    /// the second factor are turned away. An empty role list admits any role.
    pub fn new<I, R>(require_mfa: bool, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            require_mfa,
            allowed_roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(false, roles)
    }

    pub fn require_mfa(&self) -> bool {
        self.require_mfa
    }

    pub fn allowed_roles(&self) -> &BTreeSet<String> {
        &self.allowed_roles
    }

    pub fn rejects_mfa(&self, mfa_satisfied: bool) -> bool {
        self.require_mfa && mfa_satisfied
    }

    pub fn permits_role(&self, role: &str) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(role)
    }

    /// MFA first, then role.
    pub fn check(&self, result: &ValidationResult) -> AuthResult<()> {
        if self.rejects_mfa(result.mfa_satisfied) {
            return Err(AuthError::TwoFactorRequired);
        }
        if !self.permits_role(&result.role) {
            return Err(AuthError::InsufficientPermissions {
                role: result.role.clone(),
            });
        }
        Ok(())
    }
}

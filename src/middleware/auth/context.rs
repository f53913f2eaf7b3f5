//! Request-scoped authentication state.
//!
//! The authentication stage is the only writer of [`AuthContext`]; role
//! checks and handlers only read it. A request without one has no roles.

use tokio::time::Instant;

use crate::services::oidc::RoleSet;

/// Identity facts attached after a token verified successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    roles: RoleSet,
}

impl AuthContext {
    pub fn new(roles: RoleSet) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }
}

/// State threaded through the pipeline stages of a single request.
///
/// Stored in the request extensions once the pipeline finishes, so later
/// layers and handlers see the same value.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    auth: Option<AuthContext>,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(&self) -> Option<&AuthContext> {
        self.auth.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Held roles; empty when the request never authenticated.
    pub fn roles(&self) -> &[String] {
        self.auth
            .as_ref()
            .map(|a| a.roles.as_slice())
            .unwrap_or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub(crate) fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }
}

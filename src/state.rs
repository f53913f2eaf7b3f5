/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - verifier: 起動時に discovery 済みの TokenValidator (テストでは差し替え可)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::middleware::auth::{Authenticate, Pipeline};
use crate::services::oidc::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub admin_roles: Arc<[String]>,
    pub verify_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("admin_roles", &self.admin_roles)
            .field("verify_timeout", &self.verify_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        admin_roles: Vec<String>,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            admin_roles: admin_roles.into(),
            verify_timeout,
        }
    }

    /// Pipeline that authenticates every request it guards.
    pub fn auth_pipeline(&self) -> Pipeline {
        Pipeline::new()
            .then(Authenticate::new(self.verifier.clone()))
            .verify_timeout(self.verify_timeout)
    }
}

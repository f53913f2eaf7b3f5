use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, request::Parts};

use super::bearer::extract_bearer_token;
use super::context::{AuthContext, RequestContext};
use super::pipeline::{Outcome, Stage};
use super::rejection::AuthRejection;
use crate::services::oidc::{TokenVerifier, ValidationError};

/// Bearer-token authentication.
///
/// Attaches an [`AuthContext`] on success; otherwise ends the request with 401.
#[derive(Clone)]
pub struct Authenticate {
    verifier: Arc<dyn TokenVerifier>,
}

impl Authenticate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Stage for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn run(&self, parts: &Parts, ctx: RequestContext) -> Outcome {
        let header = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) if !value.is_empty() => value,
            _ => return Outcome::Reject(AuthRejection::MissingHeader),
        };

        let token = match header
            .to_str()
            .ok()
            .and_then(|value| extract_bearer_token(value).ok())
        {
            Some(token) => token,
            None => return Outcome::Reject(AuthRejection::MalformedHeader),
        };

        let verified = match ctx.deadline() {
            Some(deadline) => tokio::time::timeout_at(deadline, self.verifier.validate(token))
                .await
                .unwrap_or_else(|_| Err(ValidationError::invalid("verification deadline exceeded"))),
            None => self.verifier.validate(token).await,
        };

        match verified {
            Ok(roles) => {
                tracing::debug!(roles = ?roles.as_slice(), "request authenticated");
                Outcome::Continue(ctx.with_auth(AuthContext::new(roles)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "access token verification failed");
                Outcome::Reject(AuthRejection::TokenInvalid(err))
            }
        }
    }
}

/// Role-based authorization: passes when the caller holds any required role.
///
/// Must run after [`Authenticate`]; a request that never authenticated has no
/// roles and is denied exactly like one with an empty role set.
#[derive(Debug, Clone)]
pub struct RoleGate {
    required: Vec<String>,
}

impl RoleGate {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: Vec<String> = roles.into_iter().map(Into::into).collect();
        if required.is_empty() {
            tracing::warn!("role gate configured without roles; every request will be denied");
        }
        Self { required }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn allows(&self, ctx: &RequestContext) -> bool {
        ctx.has_any_role(&self.required)
    }
}

#[async_trait]
impl Stage for RoleGate {
    fn name(&self) -> &'static str {
        "role_gate"
    }

    async fn run(&self, _parts: &Parts, ctx: RequestContext) -> Outcome {
        if self.allows(&ctx) {
            Outcome::Continue(ctx)
        } else {
            tracing::info!(
                required = ?self.required,
                held = ?ctx.roles(),
                "insufficient permissions"
            );
            Outcome::Reject(AuthRejection::InsufficientRole)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::http::Request;
    use tokio::time::Instant;

    use crate::services::oidc::RoleSet;

    /// Verifier double: fixed answer, records what it was asked.
    struct FakeVerifier {
        answer: Result<RoleSet, ValidationError>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl FakeVerifier {
        fn ok(roles: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(roles.iter().copied().collect()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn err(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(ValidationError::invalid(reason)),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenVerifier for FakeVerifier {
        async fn validate(&self, token: &str) -> Result<RoleSet, ValidationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(token.to_string());
            self.answer.clone()
        }
    }

    struct SlowVerifier;

    #[async_trait]
    impl TokenVerifier for SlowVerifier {
        async fn validate(&self, _token: &str) -> Result<RoleSet, ValidationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(RoleSet::default())
        }
    }

    fn parts_with(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/me");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn authenticated(roles: &[&str]) -> RequestContext {
        RequestContext::new().with_auth(AuthContext::new(roles.iter().copied().collect()))
    }

    async fn run(stage: &dyn Stage, parts: &Parts, ctx: RequestContext) -> Result<RequestContext, AuthRejection> {
        match stage.run(parts, ctx).await {
            Outcome::Continue(ctx) => Ok(ctx),
            Outcome::Reject(rejection) => Err(rejection),
        }
    }

    #[tokio::test]
    async fn missing_header_skips_validator() {
        let verifier = FakeVerifier::ok(&["admin"]);
        let stage = Authenticate::new(verifier.clone());

        let result = run(&stage, &parts_with(None), RequestContext::new()).await;

        assert_eq!(result.unwrap_err(), AuthRejection::MissingHeader);
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn empty_header_counts_as_missing() {
        let verifier = FakeVerifier::ok(&["admin"]);
        let stage = Authenticate::new(verifier.clone());

        let result = run(&stage, &parts_with(Some("")), RequestContext::new()).await;

        assert_eq!(result.unwrap_err(), AuthRejection::MissingHeader);
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_headers_skip_validator() {
        let verifier = FakeVerifier::ok(&["admin"]);
        let stage = Authenticate::new(verifier.clone());

        for value in ["Token abc", "bearer abc", "Bearer ", "Bearer", "Basic Zm9vOmJhcg=="] {
            let result = run(&stage, &parts_with(Some(value)), RequestContext::new()).await;
            assert_eq!(result.unwrap_err(), AuthRejection::MalformedHeader, "header {value:?}");
        }
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn non_ascii_header_is_malformed() {
        let verifier = FakeVerifier::ok(&["admin"]);
        let stage = Authenticate::new(verifier.clone());

        let mut parts = parts_with(None);
        parts.headers.insert(
            header::AUTHORIZATION,
            axum::http::HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );

        let result = run(&stage, &parts, RequestContext::new()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::MalformedHeader);
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn valid_token_attaches_roles() {
        let verifier = FakeVerifier::ok(&["admin", "viewer"]);
        let stage = Authenticate::new(verifier.clone());

        let ctx = run(&stage, &parts_with(Some("Bearer abc.def.ghi")), RequestContext::new())
            .await
            .unwrap();

        assert!(ctx.is_authenticated());
        assert_eq!(ctx.roles(), ["admin", "viewer"]);
        assert_eq!(*verifier.seen.lock().unwrap(), vec!["abc.def.ghi".to_string()]);
    }

    #[tokio::test]
    async fn verified_token_without_roles_is_still_authenticated() {
        let stage = Authenticate::new(FakeVerifier::ok(&[]));

        let ctx = run(&stage, &parts_with(Some("Bearer t")), RequestContext::new())
            .await
            .unwrap();

        assert!(ctx.is_authenticated());
        assert!(ctx.roles().is_empty());
    }

    #[tokio::test]
    async fn failed_validation_is_unauthorized_with_reason() {
        let verifier = FakeVerifier::err("token is expired");
        let stage = Authenticate::new(verifier.clone());

        let result = run(&stage, &parts_with(Some("Bearer t")), RequestContext::new()).await;

        let rejection = result.unwrap_err();
        assert_eq!(
            rejection.to_string(),
            "token validation failed: token verification failed: token is expired"
        );
        assert_eq!(verifier.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_verification() {
        let stage = Authenticate::new(Arc::new(SlowVerifier));
        let ctx = RequestContext::new().with_deadline(Instant::now() + Duration::from_secs(1));

        let result = run(&stage, &parts_with(Some("Bearer t")), ctx).await;

        assert_eq!(
            result.unwrap_err(),
            AuthRejection::TokenInvalid(ValidationError::invalid("verification deadline exceeded"))
        );
    }

    #[tokio::test]
    async fn gate_allows_any_required_role() {
        let gate = RoleGate::any_of(["admin", "editor"]);
        let ctx = run(&gate, &parts_with(None), authenticated(&["editor"])).await;
        assert!(ctx.is_ok());
    }

    #[tokio::test]
    async fn gate_denies_unrelated_role() {
        let gate = RoleGate::any_of(["admin", "editor"]);
        let result = run(&gate, &parts_with(None), authenticated(&["viewer"])).await;
        assert_eq!(result.unwrap_err(), AuthRejection::InsufficientRole);
    }

    #[tokio::test]
    async fn gate_treats_unauthenticated_like_empty_roles() {
        let gate = RoleGate::any_of(["admin"]);

        let anonymous = run(&gate, &parts_with(None), RequestContext::new()).await;
        let no_roles = run(&gate, &parts_with(None), authenticated(&[])).await;

        assert_eq!(anonymous.unwrap_err(), AuthRejection::InsufficientRole);
        assert_eq!(no_roles.unwrap_err(), AuthRejection::InsufficientRole);
    }

    #[tokio::test]
    async fn gate_passes_context_unchanged() {
        let gate = RoleGate::any_of(["admin"]);
        let ctx = run(&gate, &parts_with(None), authenticated(&["viewer", "admin"]))
            .await
            .unwrap();
        assert_eq!(ctx.roles(), ["viewer", "admin"]);
    }

    #[tokio::test]
    async fn gate_without_roles_denies_everyone() {
        let gate = RoleGate::any_of(Vec::<String>::new());
        let result = run(&gate, &parts_with(None), authenticated(&["admin"])).await;
        assert_eq!(result.unwrap_err(), AuthRejection::InsufficientRole);
    }

    #[test]
    fn role_names_are_case_sensitive() {
        let gate = RoleGate::any_of(["admin"]);
        assert!(!gate.allows(&authenticated(&["Admin"])));
    }
}

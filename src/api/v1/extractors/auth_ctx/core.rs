use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::middleware::auth::{AuthContext, RequestContext};

/// Handler で AuthContext を受け取るための extractor
///
/// The auth layer must have stored a [`RequestContext`] in the request
/// extensions; a route reached without authentication gets 401.
#[derive(Debug, Clone)]
pub struct AuthCtxExtractor(pub AuthContext);

impl<S> FromRequestParts<S> for AuthCtxExtractor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(RequestContext::auth)
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::oidc::ValidationError;

/// Terminal outcome of a failed pipeline stage.
///
/// The display text is the exact plain-text body sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization header")]
    MalformedHeader,

    #[error("token validation failed: {0}")]
    TokenInvalid(#[from] ValidationError),

    #[error("insufficient permissions")]
    InsufficientRole,
}

impl AuthRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthRejection::MissingHeader
            | AuthRejection::MalformedHeader
            | AuthRejection::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            AuthRejection::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

//! Authentication and role authorization for protected routes.
//!
//! Request flow:
//!
//! 1. [`Authenticate`] reads `Authorization: Bearer <token>`, verifies the token
//!    with a [`TokenVerifier`](crate::services::oidc::TokenVerifier) and
//!    attaches an [`AuthContext`] to the [`RequestContext`]
//! 2. [`RoleGate`] lets the request through when it holds any required role
//! 3. handlers read the context with
//!    [`AuthCtxExtractor`](crate::api::v1::extractors::AuthCtxExtractor)
//!
//! Every failure is terminal for the request and maps to a fixed
//! [`AuthRejection`].

pub mod access;
pub mod bearer;
pub mod context;
pub mod pipeline;
pub mod rejection;
pub mod stages;

pub use access::{apply, apply_to_routes, require_roles};
pub use bearer::{BearerError, extract_bearer_token};
pub use context::{AuthContext, RequestContext};
pub use pipeline::{Outcome, Pipeline, Stage};
pub use rejection::AuthRejection;
pub use stages::{Authenticate, RoleGate};

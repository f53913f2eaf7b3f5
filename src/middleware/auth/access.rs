//! Runs a [`Pipeline`] as axum middleware.
//!
//! The [`RequestContext`] lives in the request extensions between layers, so
//! an outer authentication layer and an inner per-route role gate see the same
//! context.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use super::context::RequestContext;
use super::pipeline::Pipeline;
use super::rejection::AuthRejection;
use super::stages::RoleGate;

/// Apply `pipeline` to every route in `router`, including unmatched paths.
///
/// ```ignore
/// let api = api::v1::routes(state.clone());
/// let api = middleware::auth::apply(api, Pipeline::new().then(Authenticate::new(validator)));
/// app = app.nest("/api/v1", api);
/// ```
pub fn apply<S>(router: Router<S>, pipeline: Pipeline) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(pipeline, run_pipeline))
}

/// Apply `pipeline` only to the routes already added to `router`.
pub fn apply_to_routes<S>(router: Router<S>, pipeline: Pipeline) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(pipeline, run_pipeline))
}

/// Gate the routes in `router` on holding any of `roles`.
///
/// Needs an authentication layer outside of it.
pub fn require_roles<S, I, R>(router: Router<S>, roles: I) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = R>,
    R: Into<String>,
{
    apply_to_routes(router, Pipeline::new().then(RoleGate::any_of(roles)))
}

async fn run_pipeline(
    State(pipeline): State<Pipeline>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let (mut parts, body) = req.into_parts();

    let ctx = parts
        .extensions
        .remove::<RequestContext>()
        .unwrap_or_default();

    let ctx = pipeline.run(&parts, ctx).await?;

    // middleware → extractor への受け渡し
    parts.extensions.insert(ctx);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

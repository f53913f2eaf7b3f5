use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::AuthCtxExtractor;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub roles: Vec<String>,
}

/// GET /me: the realm roles carried by the caller's token.
pub async fn me(AuthCtxExtractor(auth): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        roles: auth.roles().clone().into_vec(),
    })
}

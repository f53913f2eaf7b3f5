use axum::Json;
use serde_json::{Value, json};

use crate::api::v1::extractors::AuthCtxExtractor;

/// GET /admin/ping: only reachable through the admin role gate.
pub async fn ping(AuthCtxExtractor(auth): AuthCtxExtractor) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "roles": auth.roles().as_slice(),
    }))
}

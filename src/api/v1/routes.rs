/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /me (認証必須), /admin/... (認証 + role) を merge
 * - 認証は route_layer で保護対象の route だけに適用する
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{admin, me::me};
use crate::middleware::auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    // role gate は内側、認証は外側
    let admin = auth::require_roles(
        Router::new().route("/admin/ping", get(admin::ping)),
        state.admin_roles.iter().cloned(),
    );

    let protected = Router::new().route("/me", get(me)).merge(admin);

    auth::apply_to_routes(protected, state.auth_pipeline())
}

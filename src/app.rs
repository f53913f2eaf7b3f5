/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → TokenValidator の discovery → Router 組み立て
 * - Middleware の適用 (request-id / trace / timeout, 認証は routes 側)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, v1::handlers::health::health};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::http::{self, HttpPolicy};
use crate::services::oidc::TokenValidator;
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG=info,oidc_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development では即落とす
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, config.http_policy());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, AppError> {
    // provider に届かない / 設定が壊れている場合は起動しない
    let validator = TokenValidator::discover(config.validator_config()).await?;

    Ok(AppState::new(
        Arc::new(validator),
        config.admin_roles.clone(),
        config.oidc_verify_timeout,
    ))
}

/// Public `/health` plus the authenticated `/api/v1` tree, wrapped in the
/// HTTP-level layers.
pub fn build_router(state: AppState, policy: HttpPolicy) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state);

    http::apply(router, policy)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

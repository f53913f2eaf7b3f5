//! Bearer-token authentication and realm-role authorization for axum
//! services backed by an OpenID Connect provider.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

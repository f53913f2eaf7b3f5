//! Shared fixtures: an in-process identity provider and token helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use oidc_gate::services::oidc::{ProviderConfig, TokenValidator, ValidatorConfig};

pub const CLIENT_ID: &str = "demo-api";
pub const PRIMARY_KID: &str = "test-key-1";
pub const ROTATED_KID: &str = "test-key-2";

/// Test-only RSA key pair with its public JWK.
pub struct TestKey {
    pub kid: &'static str,
    pub encoding: EncodingKey,
    pub jwk: Value,
}

pub fn primary_key() -> TestKey {
    load_key(
        PRIMARY_KID,
        include_str!("../fixtures/primary_rsa.pem"),
        include_str!("../fixtures/primary_jwk.json"),
    )
}

pub fn rotated_key() -> TestKey {
    load_key(
        ROTATED_KID,
        include_str!("../fixtures/rotated_rsa.pem"),
        include_str!("../fixtures/rotated_jwk.json"),
    )
}

fn load_key(kid: &'static str, pem: &str, jwk: &str) -> TestKey {
    TestKey {
        kid,
        encoding: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
        jwk: serde_json::from_str(jwk).unwrap(),
    }
}

#[derive(Clone)]
struct ProviderState {
    discovery: Arc<RwLock<Value>>,
    jwks: Arc<RwLock<Value>>,
    jwks_hits: Arc<AtomicUsize>,
    jwks_down: Arc<AtomicBool>,
}

/// Mock OIDC provider serving discovery and JWKS on `127.0.0.1:0`.
pub struct MockProvider {
    pub issuer: String,
    discovery: Arc<RwLock<Value>>,
    jwks: Arc<RwLock<Value>>,
    jwks_hits: Arc<AtomicUsize>,
    jwks_down: Arc<AtomicBool>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockProvider {
    pub async fn start(keys: &[&TestKey]) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let issuer = format!("http://127.0.0.1:{}/realms/test", addr.port());

        let discovery = Arc::new(RwLock::new(json!({
            "issuer": issuer,
            "jwks_uri": format!("{issuer}/protocol/openid-connect/certs"),
            "id_token_signing_alg_values_supported": ["RS256"],
        })));
        let jwks = Arc::new(RwLock::new(jwk_set(keys)));
        let jwks_hits = Arc::new(AtomicUsize::new(0));
        let jwks_down = Arc::new(AtomicBool::new(false));

        let app = Router::new()
            .route("/realms/test/.well-known/openid-configuration", get(serve_discovery))
            .route("/realms/test/protocol/openid-connect/certs", get(serve_jwks))
            .with_state(ProviderState {
                discovery: discovery.clone(),
                jwks: jwks.clone(),
                jwks_hits: jwks_hits.clone(),
                jwks_down: jwks_down.clone(),
            });

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            issuer,
            discovery,
            jwks,
            jwks_hits,
            jwks_down,
            _handle: handle,
        }
    }

    pub async fn set_keys(&self, keys: &[&TestKey]) {
        self.set_jwks(jwk_set(keys)).await;
    }

    pub async fn set_jwks(&self, document: Value) {
        *self.jwks.write().await = document;
    }

    /// Number of JWKS requests served so far, failed ones included.
    pub fn jwks_hits(&self) -> usize {
        self.jwks_hits.load(Ordering::SeqCst)
    }

    /// Make the JWKS endpoint answer 503 until switched back.
    pub fn set_jwks_down(&self, down: bool) {
        self.jwks_down.store(down, Ordering::SeqCst);
    }

    pub async fn set_discovery(&self, document: Value) {
        *self.discovery.write().await = document;
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            min_key_refresh_interval: Duration::ZERO,
            ..ValidatorConfig::new(ProviderConfig::new(self.issuer.clone(), CLIENT_ID))
        }
    }

    pub async fn validator(&self) -> TokenValidator {
        TokenValidator::discover(self.validator_config())
            .await
            .expect("discovery against mock provider")
    }

    /// Claims a valid access token for this provider would carry.
    pub fn claims(&self, roles: &[&str]) -> Value {
        json!({
            "iss": self.issuer,
            "aud": CLIENT_ID,
            "sub": "user-1",
            "iat": now(),
            "exp": now() + 300,
            "realm_access": { "roles": roles },
        })
    }
}

async fn serve_discovery(State(state): State<ProviderState>) -> Json<Value> {
    Json(state.discovery.read().await.clone())
}

async fn serve_jwks(State(state): State<ProviderState>) -> Result<Json<Value>, StatusCode> {
    state.jwks_hits.fetch_add(1, Ordering::SeqCst);
    if state.jwks_down.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(state.jwks.read().await.clone()))
}

fn jwk_set(keys: &[&TestKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk.clone()).collect::<Vec<_>>() })
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn sign(claims: &Value, key: &TestKey) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid.to_string());
    jsonwebtoken::encode(&header, claims, &key.encoding).unwrap()
}

pub fn sign_without_kid(claims: &Value, key: &TestKey) -> String {
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key.encoding).unwrap()
}

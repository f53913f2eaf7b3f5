//! Provider signing keys (JWKS) with on-demand refresh.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use serde::Deserialize;
use url::Url;

use super::error::DiscoveryError;
use super::provider::fetch_json;

/// One usable verification key from the provider's JWKS.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: Option<String>,
    pub key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("family", &self.key.family())
            .finish()
    }
}

pub type KeySnapshot = Arc<Vec<SigningKey>>;

/// Cached key set for a single `jwks_uri`.
///
/// Readers clone the current snapshot and never wait on a refresh. Only
/// callers that missed a `kid` queue on `refresh_gate`, and only one of them
/// actually goes to the network.
pub struct KeySet {
    jwks_uri: Url,
    client: reqwest::Client,
    current: RwLock<KeySnapshot>,
    refresh_gate: tokio::sync::Mutex<Instant>,
    min_refresh_interval: Duration,
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("jwks_uri", &self.jwks_uri.as_str())
            .field("keys", &self.snapshot().len())
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}

impl KeySet {
    /// Fetch the key set once; fails if the endpoint yields no usable key.
    pub async fn fetch(
        client: reqwest::Client,
        jwks_uri: &str,
        min_refresh_interval: Duration,
    ) -> Result<Self, DiscoveryError> {
        let jwks_uri = Url::parse(jwks_uri)?;
        let keys = load(&client, &jwks_uri).await?;

        tracing::info!(
            jwks_uri = %jwks_uri,
            key_count = keys.len(),
            "loaded provider signing keys"
        );

        Ok(Self {
            jwks_uri,
            client,
            current: RwLock::new(Arc::new(keys)),
            refresh_gate: tokio::sync::Mutex::new(Instant::now()),
            min_refresh_interval,
        })
    }

    pub fn snapshot(&self) -> KeySnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-fetch the key set after `seen` failed to contain a wanted `kid`.
    ///
    /// Returns the newer snapshot when another caller already refreshed, and
    /// `seen` itself when the last refresh is more recent than the minimum
    /// interval.
    pub async fn refresh(&self, seen: &KeySnapshot) -> Result<KeySnapshot, DiscoveryError> {
        let mut last_refresh = self.refresh_gate.lock().await;

        let current = self.snapshot();
        if !Arc::ptr_eq(&current, seen) {
            return Ok(current);
        }
        if last_refresh.elapsed() < self.min_refresh_interval {
            tracing::debug!(jwks_uri = %self.jwks_uri, "key refresh throttled");
            return Ok(current);
        }

        // a failed fetch counts against the interval too
        *last_refresh = Instant::now();
        let keys = Arc::new(load(&self.client, &self.jwks_uri).await?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = keys.clone();

        tracing::info!(
            jwks_uri = %self.jwks_uri,
            key_count = keys.len(),
            "provider signing keys refreshed"
        );

        Ok(keys)
    }
}

// Keys are parsed one by one so a single exotic entry does not reject the whole set.
#[derive(Debug, Deserialize)]
struct RawJwkSet {
    keys: Vec<serde_json::Value>,
}

async fn load(client: &reqwest::Client, jwks_uri: &Url) -> Result<Vec<SigningKey>, DiscoveryError> {
    let jwks: RawJwkSet = fetch_json(client, jwks_uri.clone()).await?;
    let keys = signing_keys(jwks);

    if keys.is_empty() {
        return Err(DiscoveryError::NoSigningKeys {
            url: jwks_uri.to_string(),
        });
    }

    Ok(keys)
}

fn signing_keys(jwks: RawJwkSet) -> Vec<SigningKey> {
    jwks.keys
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Jwk>(raw) {
            Ok(jwk) => Some(jwk),
            Err(err) => {
                tracing::warn!(error = %err, "unsupported JWK, skipping");
                None
            }
        })
        .filter(|jwk| !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)))
        .filter_map(|jwk| match DecodingKey::from_jwk(&jwk) {
            Ok(key) => Some(SigningKey {
                kid: jwk.common.key_id,
                key,
            }),
            Err(err) => {
                tracing::warn!(
                    kid = ?jwk.common.key_id,
                    error = %err,
                    "failed to parse JWK, skipping"
                );
                None
            }
        })
        .collect()
}

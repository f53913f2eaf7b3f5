//! OIDC provider discovery (`/.well-known/openid-configuration`).

use std::str::FromStr;

use jsonwebtoken::{Algorithm, AlgorithmFamily};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::DiscoveryError;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Which provider to trust and which audience to expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Example: `https://keycloak.example.com/realms/dcs`
    pub issuer_url: String,
    /// `aud` claim must contain this value.
    pub client_id: String,
}

impl ProviderConfig {
    pub fn new(issuer_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            client_id: client_id.into(),
        }
    }

    /// Discovery document location derived from the issuer.
    pub fn discovery_url(&self) -> Result<Url, DiscoveryError> {
        let base = self.issuer_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{DISCOVERY_PATH}"))?)
    }
}

/// The parts of the discovery document this crate relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Fetch and sanity-check the discovery document for `config`.
    pub async fn discover(
        client: &reqwest::Client,
        config: &ProviderConfig,
    ) -> Result<Self, DiscoveryError> {
        let url = config.discovery_url()?;
        let metadata: ProviderMetadata = fetch_json(client, url).await?;

        if metadata.issuer != config.issuer_url {
            return Err(DiscoveryError::IssuerMismatch {
                expected: config.issuer_url.clone(),
                found: metadata.issuer,
            });
        }

        tracing::debug!(
            issuer = %metadata.issuer,
            jwks_uri = %metadata.jwks_uri,
            "discovered OIDC provider"
        );

        Ok(metadata)
    }

    /// Asymmetric algorithms the provider advertises; `RS256` when it advertises none.
    ///
    /// Shared-secret algorithms are never accepted because the verification keys are public.
    pub fn signing_algorithms(&self) -> Vec<Algorithm> {
        let algs: Vec<Algorithm> = self
            .id_token_signing_alg_values_supported
            .iter()
            .filter_map(|name| Algorithm::from_str(name).ok())
            .filter(|alg| is_asymmetric(*alg))
            .collect();

        if algs.is_empty() {
            vec![Algorithm::RS256]
        } else {
            algs
        }
    }
}

fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Family a header `alg` needs its key to belong to.
pub(crate) fn family_of(alg: Algorithm) -> AlgorithmFamily {
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => AlgorithmFamily::Hmac,
        Algorithm::ES256 | Algorithm::ES384 => AlgorithmFamily::Ec,
        Algorithm::EdDSA => AlgorithmFamily::Ed,
        _ => AlgorithmFamily::Rsa,
    }
}

pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
) -> Result<T, DiscoveryError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| DiscoveryError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            url: url.to_string(),
            status,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| DiscoveryError::Malformed {
            url: url.to_string(),
            source,
        })
}

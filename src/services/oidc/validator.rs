use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};

use super::claims::{RawClaims, RoleSet};
use super::error::{DiscoveryError, ValidationError};
use super::keys::{KeySet, KeySnapshot};
use super::provider::{ProviderConfig, ProviderMetadata, family_of};

/// Anything that can turn a bearer token into the roles it grants.
///
/// The auth pipeline depends on this seam rather than on the concrete
/// validator, so it can be driven without a live identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn validate(&self, token: &str) -> Result<RoleSet, ValidationError>;
}

/// Tunables for `TokenValidator::discover`.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub provider: ProviderConfig,
    /// Leeway applied to `nbf` only; `exp` is enforced without leeway.
    pub clock_skew: Duration,
    /// Timeout for each discovery / JWKS request.
    pub http_timeout: Duration,
    /// Minimum gap between two key refreshes triggered by an unknown `kid`.
    pub min_key_refresh_interval: Duration,
}

impl ValidatorConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            clock_skew: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
            min_key_refresh_interval: Duration::from_secs(10),
        }
    }
}

/// Verifies tokens issued by one OIDC provider for one audience.
///
/// Built once at startup and shared behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct TokenValidator {
    config: ProviderConfig,
    metadata: ProviderMetadata,
    keys: KeySet,
    algorithms: Vec<Algorithm>,
    leeway: u64,
}

impl TokenValidator {
    /// Run discovery against the issuer and load its signing keys.
    pub async fn discover(config: ValidatorConfig) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(DiscoveryError::Client)?;

        let metadata = ProviderMetadata::discover(&client, &config.provider).await?;
        let keys = KeySet::fetch(client, &metadata.jwks_uri, config.min_key_refresh_interval).await?;
        let algorithms = metadata.signing_algorithms();

        tracing::info!(
            issuer = %config.provider.issuer_url,
            client_id = %config.provider.client_id,
            algorithms = ?algorithms,
            "token validator ready"
        );

        Ok(Self {
            config: config.provider,
            metadata,
            keys,
            algorithms,
            leeway: config.clock_skew.as_secs(),
        })
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Verify `token` and return the realm roles it carries.
    pub async fn validate(&self, token: &str) -> Result<RoleSet, ValidationError> {
        let claims = self.verify(token).await?;
        Ok(RoleSet::from_claims(&claims))
    }

    /// Signature and standard-claim verification, returning the raw payload.
    pub async fn verify(&self, token: &str) -> Result<RawClaims, ValidationError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|_| ValidationError::invalid("malformed jwt"))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(ValidationError::invalid(format!(
                "unexpected signing algorithm {:?}",
                header.alg
            )));
        }

        let validation = self.validation(header.alg);
        let snapshot = self.keys.snapshot();

        let claims = match self.verify_with(token, &header, &validation, &snapshot) {
            Some(result) => result?,
            None => {
                // Unknown kid: the provider may have rotated its keys.
                let refreshed = self.keys.refresh(&snapshot).await.map_err(|err| {
                    tracing::warn!(error = %err, "failed to refresh provider signing keys");
                    ValidationError::invalid("failed to fetch signing keys")
                })?;

                self.verify_with(token, &header, &validation, &refreshed)
                    .unwrap_or_else(|| Err(ValidationError::invalid("no matching signing key")))?
            }
        };

        check_not_before(&claims, jsonwebtoken::get_current_timestamp(), self.leeway)?;
        Ok(claims)
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_issuer(&[&self.config.issuer_url]);
        validation.set_audience(&[&self.config.client_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        // nbf is checked separately so the skew never extends exp
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation
    }

    /// `None` means no key in `keys` could even be tried for this token.
    fn verify_with(
        &self,
        token: &str,
        header: &Header,
        validation: &Validation,
        keys: &KeySnapshot,
    ) -> Option<Result<RawClaims, ValidationError>> {
        let family = family_of(header.alg);
        let mut candidates = keys
            .iter()
            .filter(|k| k.key.family() == family)
            .filter(|k| match &header.kid {
                Some(kid) => k.kid.as_deref() == Some(kid.as_str()),
                None => true,
            })
            .peekable();

        candidates.peek()?;

        let mut last_err = None;
        for candidate in candidates {
            match jsonwebtoken::decode::<RawClaims>(token, &candidate.key, validation) {
                Ok(data) => return Some(Ok(data.claims)),
                // Wrong key for a kid-less token; try the next one.
                Err(err) if matches!(err.kind(), ErrorKind::InvalidSignature) => {
                    last_err = Some(err)
                }
                // The signature checked out, so this is the definitive answer.
                Err(err) => return Some(Err(err.into())),
            }
        }
        last_err.map(|err| Err(err.into()))
    }
}

#[async_trait]
impl TokenVerifier for TokenValidator {
    async fn validate(&self, token: &str) -> Result<RoleSet, ValidationError> {
        TokenValidator::validate(self, token).await
    }
}

/// `nbf` tolerates `skew_secs` of clock drift; a token without `nbf` passes.
fn check_not_before(claims: &RawClaims, now: u64, skew_secs: u64) -> Result<(), ValidationError> {
    let Some(nbf) = claims.get("nbf") else {
        return Ok(());
    };
    let nbf = nbf
        .as_u64()
        .ok_or_else(|| ValidationError::invalid("invalid format for claim 'nbf'"))?;

    if nbf > now.saturating_add(skew_secs) {
        return Err(ValidationError::invalid("token is not valid yet"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> RawClaims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_nbf_passes() {
        assert_eq!(check_not_before(&claims(json!({})), 1_000, 0), Ok(()));
    }

    #[test]
    fn nbf_within_skew_passes() {
        assert_eq!(check_not_before(&claims(json!({"nbf": 1_020})), 1_000, 30), Ok(()));
    }

    #[test]
    fn nbf_beyond_skew_fails() {
        assert_eq!(
            check_not_before(&claims(json!({"nbf": 1_031})), 1_000, 30),
            Err(ValidationError::invalid("token is not valid yet"))
        );
    }

    #[test]
    fn non_numeric_nbf_fails() {
        assert_eq!(
            check_not_before(&claims(json!({"nbf": "soon"})), 1_000, 30),
            Err(ValidationError::invalid("invalid format for claim 'nbf'"))
        );
    }
}

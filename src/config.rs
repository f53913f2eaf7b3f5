/*
 * Responsibility
 * - 環境変数の読み込み (OIDC issuer / client id, タイムアウト, admin role など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::middleware::http::HttpPolicy;
use crate::services::oidc::{ProviderConfig, ValidatorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub oidc_issuer_url: String,
    pub oidc_client_id: String,
    pub oidc_clock_skew: Duration,
    pub oidc_http_timeout: Duration,
    pub oidc_jwks_min_refresh: Duration,
    pub oidc_verify_timeout: Duration,

    pub request_timeout: Duration,
    pub admin_roles: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let oidc_issuer_url = required(&lookup, "OIDC_ISSUER_URL")?;
        Url::parse(&oidc_issuer_url).map_err(|_| ConfigError::Invalid("OIDC_ISSUER_URL"))?;

        let oidc_client_id = required(&lookup, "OIDC_CLIENT_ID")?;

        let oidc_clock_skew = seconds(&lookup, "OIDC_CLOCK_SKEW_SECONDS", 30)?;
        let oidc_http_timeout = seconds(&lookup, "OIDC_HTTP_TIMEOUT_SECONDS", 10)?;
        let oidc_jwks_min_refresh = seconds(&lookup, "OIDC_JWKS_MIN_REFRESH_SECONDS", 10)?;
        let oidc_verify_timeout = seconds(&lookup, "OIDC_VERIFY_TIMEOUT_SECONDS", 5)?;
        let request_timeout = seconds(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?;

        let admin_roles = lookup("ADMIN_ROLES")
            .unwrap_or_else(|| "admin".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        Ok(Self {
            addr,
            app_env,
            oidc_issuer_url,
            oidc_client_id,
            oidc_clock_skew,
            oidc_http_timeout,
            oidc_jwks_min_refresh,
            oidc_verify_timeout,
            request_timeout,
            admin_roles,
        })
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            clock_skew: self.oidc_clock_skew,
            http_timeout: self.oidc_http_timeout,
            min_key_refresh_interval: self.oidc_jwks_min_refresh,
            ..ValidatorConfig::new(ProviderConfig::new(
                self.oidc_issuer_url.clone(),
                self.oidc_client_id.clone(),
            ))
        }
    }

    pub fn http_policy(&self) -> HttpPolicy {
        HttpPolicy {
            request_timeout: self.request_timeout,
            ..HttpPolicy::default()
        }
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid(key)),
        None => Ok(Duration::from_secs(default)),
    }
}

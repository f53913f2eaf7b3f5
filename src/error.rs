/*
 * Responsibility
 * - 起動時エラー (設定 / OIDC discovery / listener) の集約
 * - リクエスト単位の認証エラーは middleware::auth::AuthRejection 側
 */
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::oidc::DiscoveryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize token validator: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_shown_as_is() {
        let err = AppError::from(ConfigError::Missing("OIDC_CLIENT_ID"));
        assert_eq!(err.to_string(), "missing configuration: OIDC_CLIENT_ID");
    }

    #[test]
    fn discovery_error_is_prefixed() {
        let err = AppError::from(DiscoveryError::IssuerMismatch {
            expected: "https://a".into(),
            found: "https://b".into(),
        });
        assert!(
            err.to_string()
                .starts_with("failed to initialize token validator: ")
        );
    }
}

use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BearerError {
    #[error("invalid authorization header format")]
    MalformedHeader,
}

/// Pull the token out of an `Authorization` header value.
///
/// Expected format: `Bearer <token>` (case-sensitive scheme, one space, non-empty token).
pub fn extract_bearer_token(header_value: &str) -> Result<&str, BearerError> {
    match header_value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(BearerError::MalformedHeader),
    }
}

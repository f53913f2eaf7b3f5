use thiserror::Error;

/// Failure to reach or understand the identity provider at startup.
///
/// Every variant is fatal for `TokenValidator::discover`; none of them is ever
/// produced while serving a request.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid provider url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed document at {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("issuer did not match the issuer returned by provider, expected {expected:?} got {found:?}")]
    IssuerMismatch { expected: String, found: String },

    #[error("no usable signing keys in {url}")]
    NoSigningKeys { url: String },
}

/// Per-request verification failure.
///
/// Callers treat both variants as "unauthorized"; the text exists for logs and
/// the 401 body and never contains token material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token verification failed: {0}")]
    TokenInvalid(String),

    #[error("failed to parse token claims: {0}")]
    ClaimsDecode(String),
}

impl ValidationError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::TokenInvalid(reason.into())
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        let reason = match e.kind() {
            ErrorKind::ExpiredSignature => "token is expired".to_string(),
            ErrorKind::ImmatureSignature => "token is not valid yet".to_string(),
            ErrorKind::InvalidIssuer => "issuer did not match".to_string(),
            ErrorKind::InvalidAudience => "audience did not match".to_string(),
            ErrorKind::InvalidSignature => "failed to verify signature".to_string(),
            ErrorKind::InvalidAlgorithm => "unexpected signing algorithm".to_string(),
            ErrorKind::MissingRequiredClaim(claim) => format!("missing required claim '{claim}'"),
            ErrorKind::InvalidClaimFormat(claim) => format!("invalid format for claim '{claim}'"),
            // Signature already checked out, so this is the payload failing to decode.
            ErrorKind::Json(_) => return Self::ClaimsDecode("payload is not a json object".into()),
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                "malformed jwt".to_string()
            }
            _ => "failed to verify signature".to_string(),
        };

        Self::TokenInvalid(reason)
    }
}

//! Token verification against an OpenID Connect provider.
//!
//! - [`provider`]: discovery document lookup
//! - [`keys`]: JWKS cache with refresh on unknown `kid`
//! - [`claims`]: verified payload and realm-role derivation
//! - [`validator`]: the `TokenValidator` tying them together

pub mod claims;
pub mod error;
pub mod keys;
pub mod provider;
pub mod validator;

pub use claims::{RawClaims, RoleSet};
pub use error::{DiscoveryError, ValidationError};
pub use provider::{ProviderConfig, ProviderMetadata};
pub use validator::{TokenValidator, TokenVerifier, ValidatorConfig};

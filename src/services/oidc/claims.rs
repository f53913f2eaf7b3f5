//! Verified token payload and Keycloak realm-role derivation.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decoded payload of a token that passed signature and claim checks.
pub type RawClaims = serde_json::Map<String, Value>;

/// Role names granted to the token subject, in the order the provider listed them.
///
/// Duplicates are kept; an empty set is a valid (and common) outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    /// `realm_access.roles`; anything missing or mistyped yields an empty set.
    pub fn from_claims(claims: &RawClaims) -> Self {
        let realm_access = claims
            .get("realm_access")
            .and_then(|v| RealmAccess::deserialize(v).ok())
            .unwrap_or_default();

        Self(realm_access.roles)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.iter().any(|r| r == role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> FromIterator<&'a str> for RoleSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(String::from).collect())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RealmAccess {
    #[serde(default, deserialize_with = "string_elements")]
    roles: Vec<String>,
}

// Keeps the string elements of an array; any other shape becomes empty.
fn string_elements<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let roles = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(roles)
}

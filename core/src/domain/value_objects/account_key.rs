//! Canonical account key used by both credential caches.

use serde::{Deserialize, Serialize};

/// Canonical composite key `lower(realm) + "/" + lower(account)`.
///
/// Realm and account comparisons throughout the engine are
/// case-insensitive; lowering once at key construction keeps every cache
/// lookup a plain string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey(String);

impl AccountKey {
    pub fn new(realm: &str, account: &str) -> Self {
        Self(format!(
            "{}/{}",
            realm.to_lowercase(),
            account.to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The prefix shared by every key in a realm, `lower(realm) + "/"`.
    /// Realm-wide cache flushes match on this.
    pub fn realm_prefix(realm: &str) -> String {
        format!("{}/", realm.to_lowercase())
    }

    /// Whether this key belongs to the given realm
    pub fn in_realm(&self, realm: &str) -> bool {
        self.0.starts_with(&Self::realm_prefix(realm))
    }
}

impl std::fmt::Display for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_case() {
        let key = AccountKey::new("Test.COM", "Jeff");
        assert_eq!(key.as_str(), "test.com/jeff");
        assert_eq!(key, AccountKey::new("test.com", "JEFF"));
    }

    #[test]
    fn realm_prefix_matching() {
        let key = AccountKey::new("test.com", "jeff");
        assert!(key.in_realm("TEST.com"));
        assert!(!key.in_realm("test.co"));
        assert!(!key.in_realm("example.com"));
    }
}

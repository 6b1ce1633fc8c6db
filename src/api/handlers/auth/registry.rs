//! Live token registry: at most one valid token per principal.
//!
//! Issuing a token for a principal replaces whatever token it held before, so
//! the older token stops validating even though its signature is still good.
//! Entries leave the registry on logout or when validation finds them expired.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::principal::Principal;

/// The token currently registered for a principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub principal: Principal,
}

#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Register `token` as the only live token of `principal`, returning the
    /// token it replaced.
    async fn set(&self, principal: Principal, token: String) -> Option<IssuedToken>;

    /// Entry registered under a principal name.
    async fn get(&self, name: &str) -> Option<IssuedToken>;

    /// Principal name a token is registered under.
    async fn name_for(&self, token: &str) -> Option<String>;

    /// Drop the entry of a principal.
    async fn remove(&self, name: &str) -> Option<IssuedToken>;

    /// Drop the entry of `name` only if it still holds `token`.
    ///
    /// Returns `true` when an entry was removed.
    async fn remove_if_current(&self, name: &str, token: &str) -> bool;
}

#[derive(Debug, Default)]
struct Entries {
    by_name: HashMap<String, IssuedToken>,
    by_token: HashMap<String, String>,
}

impl Entries {
    fn remove(&mut self, name: &str) -> Option<IssuedToken> {
        let removed = self.by_name.remove(name)?;
        self.by_token.remove(&removed.token);
        Some(removed)
    }
}

/// Process-local registry with a token index for reverse lookups.
#[derive(Debug, Default)]
pub struct InMemoryTokenRegistry {
    entries: RwLock<Entries>,
}

impl InMemoryTokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.by_name.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenRegistry for InMemoryTokenRegistry {
    async fn set(&self, principal: Principal, token: String) -> Option<IssuedToken> {
        let name = principal.name().to_string();
        let mut entries = self.entries.write().await;
        let replaced = entries.remove(&name);
        entries.by_token.insert(token.clone(), name.clone());
        entries
            .by_name
            .insert(name, IssuedToken { token, principal });
        replaced
    }

    async fn get(&self, name: &str) -> Option<IssuedToken> {
        self.entries.read().await.by_name.get(name).cloned()
    }

    async fn name_for(&self, token: &str) -> Option<String> {
        self.entries.read().await.by_token.get(token).cloned()
    }

    async fn remove(&self, name: &str) -> Option<IssuedToken> {
        self.entries.write().await.remove(name)
    }

    async fn remove_if_current(&self, name: &str, token: &str) -> bool {
        let mut entries = self.entries.write().await;
        let current = entries
            .by_name
            .get(name)
            .is_some_and(|issued| issued.token == token);
        if current {
            entries.remove(name);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str) -> Principal {
        Principal::Service {
            id: 1,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn set_replaces_previous_token() {
        let registry = InMemoryTokenRegistry::new();
        assert!(registry.set(service("svcA"), "t1".to_string()).await.is_none());

        let replaced = registry.set(service("svcA"), "t2".to_string()).await;
        assert_eq!(replaced.map(|issued| issued.token), Some("t1".to_string()));

        assert_eq!(registry.name_for("t1").await, None);
        assert_eq!(registry.name_for("t2").await, Some("svcA".to_string()));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn remove_drops_both_indexes() {
        let registry = InMemoryTokenRegistry::new();
        registry.set(Principal::Admin, "t1".to_string()).await;

        let removed = registry.remove("admin").await;
        assert_eq!(removed.map(|issued| issued.principal), Some(Principal::Admin));
        assert!(registry.name_for("t1").await.is_none());
        assert!(registry.remove("admin").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn remove_if_current_keeps_newer_token() {
        let registry = InMemoryTokenRegistry::new();
        registry.set(service("svcA"), "old".to_string()).await;
        registry.set(service("svcA"), "new".to_string()).await;

        assert!(!registry.remove_if_current("svcA", "old").await);
        assert_eq!(
            registry.get("svcA").await.map(|issued| issued.token),
            Some("new".to_string())
        );

        assert!(registry.remove_if_current("svcA", "new").await);
        assert!(registry.get("svcA").await.is_none());
    }
}

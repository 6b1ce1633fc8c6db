//! Shared authentication state built once at startup.

use axum::http::HeaderMap;
use secrecy::SecretString;
use std::sync::Arc;

use super::{
    registry::{InMemoryTokenRegistry, TokenRegistry},
    session::{Session, SessionStore, extract_session_id},
    token::TokenIssuer,
    verifier::{AdminVerifier, CredentialVerifier, LdapVerifier, ServiceVerifier},
};
use crate::{ldap::Directory, store::AccountStore};

/// Static administrator credentials.
#[derive(Clone)]
pub struct AdminConfig {
    pub access: String,
    /// Hex SHA-256 digest of the admin secret.
    pub secret: SecretString,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("access", &self.access)
            .field("secret", &"***")
            .finish()
    }
}

/// Issuer, registry, sessions, verifiers and the account store.
pub struct AuthState {
    issuer: TokenIssuer,
    registry: Arc<dyn TokenRegistry>,
    sessions: SessionStore,
    verifiers: Vec<Arc<dyn CredentialVerifier>>,
    store: Arc<dyn AccountStore>,
}

impl AuthState {
    /// State with the standard verifier chain: admin, service, then LDAP when
    /// a directory is configured.
    #[must_use]
    pub fn new(
        issuer: TokenIssuer,
        admin: AdminConfig,
        store: Arc<dyn AccountStore>,
        directory: Option<Arc<dyn Directory>>,
    ) -> Self {
        let mut verifiers: Vec<Arc<dyn CredentialVerifier>> = vec![
            Arc::new(AdminVerifier::new(admin.access, admin.secret)),
            Arc::new(ServiceVerifier::new(store.clone())),
        ];
        if let Some(directory) = directory {
            verifiers.push(Arc::new(LdapVerifier::new(directory)));
        }

        Self {
            sessions: SessionStore::new(issuer.lifetime_seconds()),
            issuer,
            registry: Arc::new(InMemoryTokenRegistry::new()),
            verifiers,
            store,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn TokenRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Append a verifier after the standard chain.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifiers.push(verifier);
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn registry(&self) -> &dyn TokenRegistry {
        self.registry.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub(super) fn verifiers(&self) -> &[Arc<dyn CredentialVerifier>] {
        &self.verifiers
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Session referenced by the request cookie, with its id.
    pub async fn current_session(&self, headers: &HeaderMap) -> Option<(String, Session)> {
        let id = extract_session_id(headers)?;
        let session = self.sessions.get(&id).await?;
        Some((id, session))
    }
}

//! Credential verifiers tried in order at login.
//!
//! Each verifier either recognises the credentials and returns a
//! [`Principal`], declines with `Ok(None)`, or fails with an I/O error. The
//! login flow treats a failure as a decline for that verifier.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::{principal::Principal, utils::digest_matches};
use crate::{
    ldap::{BindOutcome, Directory},
    store::AccountStore,
};

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// # Errors
    /// Returns an error when the backing store or directory cannot be reached.
    async fn attempt(&self, username: &str, password: &str) -> Result<Option<Principal>>;
}

/// Static administrator credentials from configuration.
pub struct AdminVerifier {
    access: String,
    secret_digest: SecretString,
}

impl AdminVerifier {
    #[must_use]
    pub fn new(access: String, secret_digest: SecretString) -> Self {
        Self {
            access,
            secret_digest,
        }
    }
}

#[async_trait]
impl CredentialVerifier for AdminVerifier {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn attempt(&self, username: &str, password: &str) -> Result<Option<Principal>> {
        let access_ok = username.as_bytes().ct_eq(self.access.as_bytes());
        let secret_ok = digest_matches(self.secret_digest.expose_secret(), password);
        if bool::from(access_ok & secret_ok) {
            Ok(Some(Principal::Admin))
        } else {
            Ok(None)
        }
    }
}

/// Service accounts looked up by access code.
pub struct ServiceVerifier {
    store: Arc<dyn AccountStore>,
}

impl ServiceVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialVerifier for ServiceVerifier {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn attempt(&self, username: &str, password: &str) -> Result<Option<Principal>> {
        let Some(service) = self.store.service_by_access(username).await? else {
            debug!("no service with access {username}");
            return Ok(None);
        };

        if bool::from(digest_matches(&service.secret, password)) {
            Ok(Some(Principal::Service {
                id: service.id,
                name: service.name,
            }))
        } else {
            warn!("secret mismatch for service {}", service.name);
            Ok(None)
        }
    }
}

/// Directory users authenticated by an LDAP bind.
pub struct LdapVerifier {
    directory: Arc<dyn Directory>,
}

impl LdapVerifier {
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl CredentialVerifier for LdapVerifier {
    fn name(&self) -> &'static str {
        "ldap"
    }

    async fn attempt(&self, username: &str, password: &str) -> Result<Option<Principal>> {
        match self.directory.authenticate(username, password).await? {
            BindOutcome::Success => Ok(Some(Principal::User {
                name: username.to_string(),
            })),
            outcome => {
                debug!("LDAP bind for {username} declined: {outcome:?}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::store::MemoryAccountStore;
    use anyhow::anyhow;

    pub const S3CRET_DIGEST: &str =
        "1ec1c26b50d5d3c58d9583181af8076655fe00756bf7285940ba3670f99fcba0";
    pub const SVC_SECRET_DIGEST: &str =
        "266739a274b3d2030954f1b943135d2116afe09e1a9f9d287d70bbd43ae94515";

    /// Directory that accepts a fixed set of (user, password) pairs.
    pub struct StubDirectory {
        pub accounts: Vec<(&'static str, &'static str)>,
        pub unreachable: bool,
    }

    #[async_trait]
    impl Directory for StubDirectory {
        async fn authenticate(&self, username: &str, password: &str) -> Result<BindOutcome> {
            if self.unreachable {
                return Err(anyhow!("connection refused"));
            }
            match self.accounts.iter().find(|(user, _)| *user == username) {
                Some((_, pass)) if *pass == password => Ok(BindOutcome::Success),
                Some(_) => Ok(BindOutcome::InvalidCredentials),
                None => Ok(BindOutcome::UserNotFound),
            }
        }
    }

    fn admin() -> AdminVerifier {
        AdminVerifier::new("root".to_string(), SecretString::from(S3CRET_DIGEST))
    }

    #[tokio::test]
    async fn admin_requires_access_and_secret() -> Result<()> {
        let verifier = admin();
        assert_eq!(verifier.attempt("root", "s3cret").await?, Some(Principal::Admin));
        assert_eq!(verifier.attempt("root", "wrong").await?, None);
        assert_eq!(verifier.attempt("rooT", "s3cret").await?, None);
        assert_eq!(verifier.attempt("", "").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn service_fails_closed_on_mismatch() -> Result<()> {
        let store = Arc::new(MemoryAccountStore::new());
        let id = store.add_service("svcA", "svc-access", SVC_SECRET_DIGEST).await;
        let verifier = ServiceVerifier::new(store);

        assert_eq!(
            verifier.attempt("svc-access", "svc-secret").await?,
            Some(Principal::Service {
                id,
                name: "svcA".to_string()
            })
        );
        assert_eq!(verifier.attempt("svc-access", "nope").await?, None);
        assert_eq!(verifier.attempt("unknown", "svc-secret").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn ldap_maps_bind_outcomes() -> Result<()> {
        let verifier = LdapVerifier::new(Arc::new(StubDirectory {
            accounts: vec![("alice", "wonderland")],
            unreachable: false,
        }));
        assert_eq!(
            verifier.attempt("alice", "wonderland").await?,
            Some(Principal::User {
                name: "alice".to_string()
            })
        );
        assert_eq!(verifier.attempt("alice", "nope").await?, None);
        assert_eq!(verifier.attempt("bob", "wonderland").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn ldap_errors_propagate() {
        let verifier = LdapVerifier::new(Arc::new(StubDirectory {
            accounts: Vec::new(),
            unreachable: true,
        }));
        assert!(verifier.attempt("alice", "wonderland").await.is_err());
    }
}

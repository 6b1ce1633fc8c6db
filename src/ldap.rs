//! LDAP bind authentication.
//!
//! With a service bind account configured the directory is searched for the
//! login attribute first and the user is bound by the DN found; otherwise the
//! user DN is built from the RDN attribute and the base DN.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, dn_escape, ldap_escape};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// LDAP result code for `invalidCredentials`.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Result of a bind attempt that reached the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    Success,
    InvalidCredentials,
    UserNotFound,
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Authenticate `username` with `password` against the directory.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be reached or answers with an
    /// unexpected result code.
    async fn authenticate(&self, username: &str, password: &str) -> Result<BindOutcome>;
}

#[derive(Clone)]
pub struct LdapConfig {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub base_dn: String,
    pub rdn_attr: String,
    pub login_attr: String,
    pub bind_user: Option<String>,
    pub bind_pass: Option<SecretString>,
    pub timeout: Duration,
}

impl LdapConfig {
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "ldaps" } else { "ldap" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// DN used for a direct bind when no service account is configured.
    #[must_use]
    pub fn user_dn(&self, username: &str) -> String {
        format!("{}={},{}", self.rdn_attr, dn_escape(username), self.base_dn)
    }

    #[must_use]
    pub fn login_filter(&self, username: &str) -> String {
        format!("({}={})", self.login_attr, ldap_escape(username))
    }
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("base_dn", &self.base_dn)
            .field("rdn_attr", &self.rdn_attr)
            .field("login_attr", &self.login_attr)
            .field("bind_user", &self.bind_user)
            .field("bind_pass", &self.bind_pass.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct LdapDirectory {
    config: LdapConfig,
}

impl LdapDirectory {
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.timeout);
        let url = self.config.url();
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .with_context(|| format!("failed to connect to {url}"))?;

        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                warn!("LDAP connection error: {err}");
            }
        });

        Ok(ldap)
    }

    /// Find the user's DN through the service bind account.
    async fn search_dn(
        &self,
        ldap: &mut Ldap,
        bind_user: &str,
        username: &str,
    ) -> Result<Option<String>> {
        let bind_pass = self
            .config
            .bind_pass
            .as_ref()
            .map_or("", |pass| pass.expose_secret());

        ldap.with_timeout(self.config.timeout)
            .simple_bind(bind_user, bind_pass)
            .await
            .context("LDAP service bind failed")?
            .success()
            .context("LDAP service bind rejected")?;

        let filter = self.config.login_filter(username);
        let (entries, _) = ldap
            .with_timeout(self.config.timeout)
            .search(&self.config.base_dn, Scope::Subtree, &filter, vec!["1.1"])
            .await
            .context("LDAP search failed")?
            .success()
            .context("LDAP search rejected")?;

        match entries.len() {
            0 => Ok(None),
            1 => Ok(entries
                .into_iter()
                .next()
                .map(|entry| SearchEntry::construct(entry).dn)),
            n => {
                warn!("LDAP search for {filter} returned {n} entries");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    #[instrument(skip(self, password))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<BindOutcome> {
        // An empty password would turn into an unauthenticated bind, which
        // most servers accept.
        if username.is_empty() || password.is_empty() {
            return Ok(BindOutcome::InvalidCredentials);
        }

        let mut ldap = self.connect().await?;

        let user_dn = if let Some(bind_user) = &self.config.bind_user {
            match self.search_dn(&mut ldap, bind_user, username).await? {
                Some(dn) => dn,
                None => {
                    let _ = ldap.unbind().await;
                    return Ok(BindOutcome::UserNotFound);
                }
            }
        } else {
            self.config.user_dn(username)
        };

        debug!("binding as {user_dn}");

        let result = ldap
            .with_timeout(self.config.timeout)
            .simple_bind(&user_dn, password)
            .await
            .context("LDAP user bind failed")?;
        let _ = ldap.unbind().await;

        match result.rc {
            0 => Ok(BindOutcome::Success),
            RC_INVALID_CREDENTIALS => Ok(BindOutcome::InvalidCredentials),
            rc => Err(anyhow!("LDAP bind for {user_dn} returned rc {rc}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LdapConfig {
        LdapConfig {
            host: "ldap.example.org".to_string(),
            port: 389,
            ssl: false,
            base_dn: "ou=people,dc=example,dc=org".to_string(),
            rdn_attr: "uid".to_string(),
            login_attr: "mail".to_string(),
            bind_user: None,
            bind_pass: Some(SecretString::from("hunter2")),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn url_follows_ssl_flag() {
        let mut config = config();
        assert_eq!(config.url(), "ldap://ldap.example.org:389");
        config.ssl = true;
        config.port = 636;
        assert_eq!(config.url(), "ldaps://ldap.example.org:636");
    }

    #[test]
    fn user_dn_and_filter_escape_input() {
        let config = config();
        assert_eq!(config.user_dn("alice"), "uid=alice,ou=people,dc=example,dc=org");
        assert_eq!(config.login_filter("alice"), "(mail=alice)");

        let dn = config.user_dn("a,uid=b");
        assert!(!dn.starts_with("uid=a,uid=b,"));

        let filter = config.login_filter("*)(uid=*");
        assert!(!filter.contains("*)(uid=*"));
        assert!(filter.starts_with("(mail=") && filter.ends_with(')'));
    }

    #[test]
    fn debug_redacts_bind_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[tokio::test]
    async fn empty_password_is_rejected_without_network() -> Result<()> {
        // Port 1 on an unresolvable host: any connection attempt would error.
        let mut config = config();
        config.host = "ldap.invalid".to_string();
        config.port = 1;
        let directory = LdapDirectory::new(config);
        assert_eq!(
            directory.authenticate("alice", "").await?,
            BindOutcome::InvalidCredentials
        );
        Ok(())
    }
}

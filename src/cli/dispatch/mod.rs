//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, admin, ldap, token};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        admin: admin::parse(matches)?,
        token: token::parse(matches)?,
        ldap: ldap::parse(matches)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::TokenAlgorithm;
    use secrecy::ExposeSecret;

    const DIGEST: &str = "1EC1C26B50D5D3C58D9583181AF8076655FE00756BF7285940BA3670F99FCBA0";

    fn matches(extra: &[&str]) -> Result<clap::ArgMatches> {
        let mut args = vec![
            "account-portal",
            "--dsn",
            "postgres://localhost/accounts",
            "--admin-access",
            "root",
            "--admin-secret",
            DIGEST,
            "--token-secret",
            "signing-key",
        ];
        args.extend_from_slice(extra);
        Ok(crate::cli::commands::new().try_get_matches_from(args)?)
    }

    fn with_clean_env<F: FnOnce() -> Result<()>>(f: F) -> Result<()> {
        temp_env::with_vars(
            [
                ("ACCOUNT_PORTAL_AUTH_METHOD", None::<&str>),
                ("ACCOUNT_PORTAL_LDAP_HOST", None),
                ("ACCOUNT_PORTAL_LDAP_BASE_DN", None),
                ("ACCOUNT_PORTAL_LDAP_BIND_USER", None),
                ("ACCOUNT_PORTAL_LDAP_BIND_PASS", None),
                ("ACCOUNT_PORTAL_LDAP_SSL", None),
                ("ACCOUNT_PORTAL_TOKEN_SECRET", None),
                ("ACCOUNT_PORTAL_TOKEN_ALGORITHM", None),
                ("ACCOUNT_PORTAL_ADMIN_ACCESS", None),
                ("ACCOUNT_PORTAL_ADMIN_SECRET", None),
            ],
            f,
        )
    }

    #[test]
    fn builds_server_action() -> Result<()> {
        with_clean_env(|| {
            let Action::Server(args) = handler(&matches(&["--port", "9000"])?)?;
            assert_eq!(args.port, 9000);
            assert_eq!(args.admin.access, "root");
            assert_eq!(args.admin.secret.expose_secret(), DIGEST.to_lowercase());
            assert_eq!(args.token.issuer(), "account-portal");
            assert_eq!(args.token.lifetime_seconds(), 3600);
            assert_eq!(args.token.algorithm(), TokenAlgorithm::Hs256);
            assert!(args.ldap.is_none());
            Ok(())
        })
    }

    #[test]
    fn token_secret_required() -> Result<()> {
        with_clean_env(|| {
            let matches = crate::cli::commands::new().try_get_matches_from(vec![
                "account-portal",
                "--dsn",
                "postgres://localhost/accounts",
                "--admin-access",
                "root",
                "--admin-secret",
                DIGEST,
            ])?;
            let err = handler(&matches).err().map(|err| err.to_string());
            assert_eq!(
                err.as_deref(),
                Some("missing required argument: --token-secret")
            );
            Ok(())
        })
    }

    #[test]
    fn ldap_requires_host_and_base_dn() -> Result<()> {
        with_clean_env(|| {
            let err = handler(&matches(&["--auth-method", "ldap"])?)
                .err()
                .map(|err| err.to_string());
            assert_eq!(err.as_deref(), Some("missing required argument: --ldap-host"));

            let Action::Server(args) = handler(&matches(&[
                "--auth-method",
                "ldap",
                "--ldap-host",
                "ldap.example.org",
                "--ldap-base-dn",
                "ou=people,dc=example,dc=org",
                "--ldap-ssl",
                "--ldap-port",
                "636",
            ])?)?;
            let ldap = args.ldap.context("ldap config missing")?;
            assert_eq!(ldap.url(), "ldaps://ldap.example.org:636");
            assert_eq!(ldap.rdn_attr, "uid");
            assert!(ldap.bind_user.is_none());
            Ok(())
        })
    }
}

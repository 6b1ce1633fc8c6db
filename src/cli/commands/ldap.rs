use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

use crate::ldap::LdapConfig;

pub const ARG_AUTH_METHOD: &str = "auth-method";
pub const ARG_LDAP_HOST: &str = "ldap-host";
pub const ARG_LDAP_PORT: &str = "ldap-port";
pub const ARG_LDAP_SSL: &str = "ldap-ssl";
pub const ARG_LDAP_BASE_DN: &str = "ldap-base-dn";
pub const ARG_LDAP_RDN_ATTR: &str = "ldap-rdn-attr";
pub const ARG_LDAP_LOGIN_ATTR: &str = "ldap-login-attr";
pub const ARG_LDAP_BIND_USER: &str = "ldap-bind-user";
pub const ARG_LDAP_BIND_PASS: &str = "ldap-bind-pass";
pub const ARG_LDAP_TIMEOUT_SECONDS: &str = "ldap-timeout-seconds";

/// Directory settings when `--auth-method ldap` is selected, `None` otherwise.
///
/// # Errors
/// Returns an error if LDAP is selected without a host or base DN.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<Option<LdapConfig>> {
    if matches.get_one::<String>(ARG_AUTH_METHOD).map(String::as_str) != Some("ldap") {
        return Ok(None);
    }

    // Helper to filter empty strings which clap might pass through if env vars are set to ""
    let get_non_empty = |id: &str| {
        matches
            .get_one::<String>(id)
            .cloned()
            .filter(|v| !v.trim().is_empty())
    };

    let Some(host) = get_non_empty(ARG_LDAP_HOST) else {
        anyhow::bail!("missing required argument: --{ARG_LDAP_HOST}");
    };
    let Some(base_dn) = get_non_empty(ARG_LDAP_BASE_DN) else {
        anyhow::bail!("missing required argument: --{ARG_LDAP_BASE_DN}");
    };

    Ok(Some(LdapConfig {
        host,
        port: matches.get_one::<u16>(ARG_LDAP_PORT).copied().unwrap_or(389),
        ssl: matches.get_flag(ARG_LDAP_SSL),
        base_dn,
        rdn_attr: get_non_empty(ARG_LDAP_RDN_ATTR).unwrap_or_else(|| "uid".to_string()),
        login_attr: get_non_empty(ARG_LDAP_LOGIN_ATTR).unwrap_or_else(|| "uid".to_string()),
        bind_user: get_non_empty(ARG_LDAP_BIND_USER),
        bind_pass: get_non_empty(ARG_LDAP_BIND_PASS).map(SecretString::from),
        timeout: Duration::from_secs(
            matches
                .get_one::<u64>(ARG_LDAP_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5),
        ),
    }))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_METHOD)
                .long(ARG_AUTH_METHOD)
                .help("Directory authentication for users: none or ldap")
                .env("ACCOUNT_PORTAL_AUTH_METHOD")
                .default_value("none")
                .value_parser(["none", "ldap"]),
        )
        .arg(
            Arg::new(ARG_LDAP_HOST)
                .long(ARG_LDAP_HOST)
                .help("LDAP server host")
                .env("ACCOUNT_PORTAL_LDAP_HOST"),
        )
        .arg(
            Arg::new(ARG_LDAP_PORT)
                .long(ARG_LDAP_PORT)
                .help("LDAP server port")
                .env("ACCOUNT_PORTAL_LDAP_PORT")
                .default_value("389")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_LDAP_SSL)
                .long(ARG_LDAP_SSL)
                .help("Connect with ldaps://")
                .env("ACCOUNT_PORTAL_LDAP_SSL")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_LDAP_BASE_DN)
                .long(ARG_LDAP_BASE_DN)
                .help("Base DN of user entries")
                .env("ACCOUNT_PORTAL_LDAP_BASE_DN"),
        )
        .arg(
            Arg::new(ARG_LDAP_RDN_ATTR)
                .long(ARG_LDAP_RDN_ATTR)
                .help("RDN attribute used to build user DNs")
                .env("ACCOUNT_PORTAL_LDAP_RDN_ATTR")
                .default_value("uid"),
        )
        .arg(
            Arg::new(ARG_LDAP_LOGIN_ATTR)
                .long(ARG_LDAP_LOGIN_ATTR)
                .help("Attribute matched against the login name when searching")
                .env("ACCOUNT_PORTAL_LDAP_LOGIN_ATTR")
                .default_value("uid"),
        )
        .arg(
            Arg::new(ARG_LDAP_BIND_USER)
                .long(ARG_LDAP_BIND_USER)
                .help("Service account DN used to search for users")
                .long_help(
                    "Service account DN used to search for users. When set, users are found by\n--ldap-login-attr under --ldap-base-dn and bound by the DN found; otherwise the\nDN is built from --ldap-rdn-attr.",
                )
                .env("ACCOUNT_PORTAL_LDAP_BIND_USER"),
        )
        .arg(
            Arg::new(ARG_LDAP_BIND_PASS)
                .long(ARG_LDAP_BIND_PASS)
                .help("Password of the service account")
                .env("ACCOUNT_PORTAL_LDAP_BIND_PASS")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_LDAP_TIMEOUT_SECONDS)
                .long(ARG_LDAP_TIMEOUT_SECONDS)
                .help("LDAP connect and operation timeout in seconds")
                .env("ACCOUNT_PORTAL_LDAP_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

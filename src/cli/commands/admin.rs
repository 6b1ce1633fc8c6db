use clap::{Arg, ArgMatches, Command, builder::ValueParser};
use secrecy::SecretString;

use crate::api::handlers::auth::{AdminConfig, valid_digest};

pub const ARG_ADMIN_ACCESS: &str = "admin-access";
pub const ARG_ADMIN_SECRET: &str = "admin-secret";

/// Accept only hex SHA-256 digests, stored lowercase.
#[must_use]
pub fn validator_digest() -> ValueParser {
    ValueParser::from(move |digest: &str| -> std::result::Result<String, String> {
        let digest = digest.trim();
        if valid_digest(digest) {
            Ok(digest.to_ascii_lowercase())
        } else {
            Err("expected a 64 character hex SHA-256 digest".to_string())
        }
    })
}

/// Parse administrator credentials from matches.
///
/// # Errors
/// Returns an error if the access name or secret digest is missing.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<AdminConfig> {
    let access = match matches.get_one::<String>(ARG_ADMIN_ACCESS) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => anyhow::bail!("missing required argument: --{ARG_ADMIN_ACCESS}"),
    };
    let Some(secret) = matches.get_one::<String>(ARG_ADMIN_SECRET) else {
        anyhow::bail!("missing required argument: --{ARG_ADMIN_SECRET}");
    };

    Ok(AdminConfig {
        access,
        secret: SecretString::from(secret.clone()),
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_ACCESS)
                .long(ARG_ADMIN_ACCESS)
                .help("Administrator login name")
                .env("ACCOUNT_PORTAL_ADMIN_ACCESS"),
        )
        .arg(
            Arg::new(ARG_ADMIN_SECRET)
                .long(ARG_ADMIN_SECRET)
                .help("Hex SHA-256 digest of the administrator secret")
                .long_help(
                    "Hex SHA-256 digest of the administrator secret, for example the output of\n`printf %s 'secret' | sha256sum`. The plain secret is never configured.",
                )
                .env("ACCOUNT_PORTAL_ADMIN_SECRET")
                .hide_env_values(true)
                .value_parser(validator_digest()),
        )
}

use clap::{Arg, ArgMatches, Command, builder::ValueParser};
use secrecy::SecretString;

use crate::api::handlers::auth::{
    DEFAULT_TOKEN_ISSUER, DEFAULT_TOKEN_LIFETIME_SECONDS, TokenAlgorithm, TokenIssuer,
};

pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_TOKEN_LIFETIME: &str = "token-lifetime";
pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_ALGORITHM: &str = "token-algorithm";

#[must_use]
pub fn validator_algorithm() -> ValueParser {
    ValueParser::from(
        move |algorithm: &str| -> std::result::Result<TokenAlgorithm, String> {
            algorithm.parse::<TokenAlgorithm>().map_err(|e| e.to_string())
        },
    )
}

/// Build the token issuer from matches.
///
/// # Errors
/// Returns an error if the signing secret is missing or empty.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<TokenIssuer> {
    let issuer = matches
        .get_one::<String>(ARG_TOKEN_ISSUER)
        .cloned()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TOKEN_ISSUER.to_string());
    let lifetime = matches
        .get_one::<i64>(ARG_TOKEN_LIFETIME)
        .copied()
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS);
    let secret = match matches.get_one::<String>(ARG_TOKEN_SECRET) {
        Some(value) if !value.is_empty() => SecretString::from(value.clone()),
        _ => anyhow::bail!("missing required argument: --{ARG_TOKEN_SECRET}"),
    };
    let algorithm = matches
        .get_one::<TokenAlgorithm>(ARG_TOKEN_ALGORITHM)
        .copied()
        .unwrap_or_default();

    Ok(TokenIssuer::new(issuer, lifetime, secret, algorithm))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Issuer (iss) of generated tokens")
                .env("ACCOUNT_PORTAL_TOKEN_ISSUER")
                .default_value(DEFAULT_TOKEN_ISSUER),
        )
        .arg(
            Arg::new(ARG_TOKEN_LIFETIME)
                .long(ARG_TOKEN_LIFETIME)
                .help("Token lifetime in seconds")
                .env("ACCOUNT_PORTAL_TOKEN_LIFETIME")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign tokens")
                .env("ACCOUNT_PORTAL_TOKEN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_ALGORITHM)
                .long(ARG_TOKEN_ALGORITHM)
                .help("Token signing algorithm: HS256, HS384, HS512")
                .env("ACCOUNT_PORTAL_TOKEN_ALGORITHM")
                .default_value("HS256")
                .value_parser(validator_algorithm()),
        )
}

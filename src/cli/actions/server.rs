use crate::{
    api::{
        self,
        handlers::auth::{AdminConfig, TokenIssuer},
    },
    ldap::LdapConfig,
};
use anyhow::Result;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub admin: AdminConfig,
    pub token: TokenIssuer,
    pub ldap: Option<LdapConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    api::new(args.port, &args.dsn, args.token, args.admin, args.ldap).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("admin_access", args.admin.access.clone()),
        ("token_issuer", args.token.issuer().to_string()),
        ("token_lifetime", format!("{}s", args.token.lifetime_seconds())),
        ("token_algorithm", args.token.algorithm().to_string()),
        (
            "auth_method",
            args.ldap
                .as_ref()
                .map_or_else(|| "none".to_string(), |ldap| format!("ldap {}", ldap.url())),
        ),
    ];
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_dsn_hides_password() {
        assert_eq!(
            redact_dsn("postgres://user:hunter2@db:5432/accounts"),
            "postgres://user:REDACTED@db:5432/accounts"
        );
        assert_eq!(
            redact_dsn("postgres://db:5432/accounts"),
            "postgres://db:5432/accounts"
        );
        assert_eq!(redact_dsn("not a url"), "invalid-dsn");
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
    }
}

//! # Account Portal
//!
//! Session and token authentication for a small account backend.
//!
//! ## Principals
//!
//! Three kinds of principal can log in, tried in this order:
//!
//! - the **administrator**, with a static access name and the SHA-256 digest of
//!   its secret taken from configuration;
//! - **service accounts**, looked up by access code, whose stored secret digest
//!   must match;
//! - **directory users**, authenticated by an LDAP bind when LDAP is enabled.
//!
//! ## Tokens
//!
//! A login returns a signed, time-bounded bearer token. Gated routes expect it
//! in the `X-TOKEN` header. Each principal has at most one live token: logging
//! in again replaces the old one, and logout or expiry removes it.
//!
//! Unknown, replaced, tampered and expired tokens all answer `401` with an
//! empty body.

pub mod api;
pub mod cli;
pub mod ldap;
pub mod store;
pub mod totp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}

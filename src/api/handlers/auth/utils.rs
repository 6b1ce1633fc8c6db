//! Small helpers for credential digests, session ids and header parsing.

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

/// Header carrying the bearer token on gated routes.
pub const X_TOKEN_HEADER: &str = "x-token";

/// Lowercase hex SHA-256 of a secret, the format stored for admin and services.
pub fn sha256_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Whether `value` looks like a hex SHA-256 digest.
pub fn valid_digest(value: &str) -> bool {
    Regex::new(r"^[0-9a-fA-F]{64}$").is_ok_and(|regex| regex.is_match(value))
}

/// Compare a stored digest with the digest of `secret` in constant time.
///
/// Stored digests are compared case-insensitively.
pub(super) fn digest_matches(expected: &str, secret: &str) -> Choice {
    let expected = expected.to_ascii_lowercase();
    sha256_hex(secret).as_bytes().ct_eq(expected.as_bytes())
}

/// Create a new opaque session id for the session cookie.
pub(super) fn generate_session_id() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session id")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Bearer token from the `X-TOKEN` header, if present and non-empty.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let token = headers.get(X_TOKEN_HEADER)?.to_str().ok()?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const S3CRET_DIGEST: &str = "1ec1c26b50d5d3c58d9583181af8076655fe00756bf7285940ba3670f99fcba0";

    #[test]
    fn sha256_hex_is_lowercase_hex() {
        assert_eq!(sha256_hex("s3cret"), S3CRET_DIGEST);
        assert!(valid_digest(&sha256_hex("anything")));
    }

    #[test]
    fn valid_digest_requires_64_hex_chars() {
        assert!(valid_digest(S3CRET_DIGEST));
        assert!(valid_digest(&S3CRET_DIGEST.to_uppercase()));
        assert!(!valid_digest("s3cret"));
        assert!(!valid_digest(&S3CRET_DIGEST[1..]));
        assert!(!valid_digest(&format!("{}g", &S3CRET_DIGEST[1..])));
    }

    #[test]
    fn digest_matches_ignores_stored_case() {
        assert!(bool::from(digest_matches(S3CRET_DIGEST, "s3cret")));
        assert!(bool::from(digest_matches(&S3CRET_DIGEST.to_uppercase(), "s3cret")));
        assert!(!bool::from(digest_matches(S3CRET_DIGEST, "wrong")));
        assert!(!bool::from(digest_matches("", "s3cret")));
    }

    #[test]
    fn session_ids_are_random_and_url_safe() -> Result<()> {
        let first = generate_session_id()?;
        let second = generate_session_id()?;
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        Ok(())
    }

    #[test]
    fn extract_token_trims_and_skips_empty() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());

        headers.insert(X_TOKEN_HEADER, HeaderValue::from_static("   "));
        assert!(extract_token(&headers).is_none());

        headers.insert(X_TOKEN_HEADER, HeaderValue::from_static(" abc.def.ghi "));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }
}

//! TOTP seeds for portal users.
//!
//! Seeds are stored base32 encoded. The provisioning URI shown to a user is
//! derived from the stored seed on every request and never persisted.

use anyhow::{Result, anyhow};
use totp_rs::{Algorithm, Secret, TOTP};

/// Issuer label shown by authenticator apps.
pub const TOTP_ISSUER: &str = "Accounting Portal";

/// Generate a random 160-bit seed, base32 encoded.
///
/// # Errors
/// Returns an error if the generated secret cannot be decoded.
pub fn generate_seed() -> Result<String> {
    let secret = Secret::generate_secret();
    let bytes = secret
        .to_bytes()
        .map_err(|e| anyhow!("Secret gen error: {e}"))?;
    match Secret::Raw(bytes).to_encoded() {
        Secret::Encoded(seed) => Ok(seed),
        Secret::Raw(_) => Err(anyhow!("Secret encoding error")),
    }
}

/// `otpauth://` URI for `seed`, labelled with `account`.
///
/// Stored seeds are rendered as they are. Seeds shorter than the 128 bits
/// required for new ones (such as 16-character legacy seeds) are accepted.
///
/// # Errors
/// Returns an error if the seed is empty or not valid base32.
pub fn provisioning_uri(seed: &str, account: &str, issuer: &str) -> Result<String> {
    let bytes = Secret::Encoded(seed.trim().to_uppercase())
        .to_bytes()
        .map_err(|e| anyhow!("invalid TOTP seed: {e}"))?;
    if bytes.is_empty() {
        return Err(anyhow!("empty TOTP seed"));
    }

    let totp = TOTP::new_unchecked(
        Algorithm::SHA1,
        6,
        1,
        30,
        bytes,
        Some(issuer.to_string()),
        account.to_string(),
    );
    Ok(totp.get_url())
}

//! Bearer token issuing and verification.
//!
//! Tokens are compact JWS strings (`header.claims.signature`) MACed with the
//! configured shared secret. Claims carry `iss`, `iat`, `exp` and `sub`, where
//! `sub` is the principal name the token was issued to, plus a `jti` so two
//! logins within the same second still get distinct tokens.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac, digest::KeyInit};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use ulid::Ulid;

pub const DEFAULT_TOKEN_ISSUER: &str = "account-portal";
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    InvalidKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("token expired")]
    Expired,
}

/// HMAC algorithms accepted for signing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl TokenAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    fn sign(self, key: &[u8], input: &[u8]) -> Result<Vec<u8>, TokenError> {
        match self {
            Self::Hs256 => mac_bytes::<Hmac<Sha256>>(key, input),
            Self::Hs384 => mac_bytes::<Hmac<Sha384>>(key, input),
            Self::Hs512 => mac_bytes::<Hmac<Sha512>>(key, input),
        }
    }

    fn verify(self, key: &[u8], input: &[u8], signature: &[u8]) -> Result<(), TokenError> {
        match self {
            Self::Hs256 => verify_mac::<Hmac<Sha256>>(key, input, signature),
            Self::Hs384 => verify_mac::<Hmac<Sha384>>(key, input, signature),
            Self::Hs512 => verify_mac::<Hmac<Sha512>>(key, input, signature),
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            _ => Err(TokenError::UnsupportedAlg(s.to_string())),
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

fn mac_bytes<M: Mac + KeyInit>(key: &[u8], input: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_mac<M: Mac + KeyInit>(
    key: &[u8],
    input: &[u8],
    signature: &[u8],
) -> Result<(), TokenError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
    mac.update(input);
    // Constant-time comparison.
    mac.verify_slice(signature)
        .map_err(|_| TokenError::InvalidSignature)
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Signs and verifies bearer tokens with the configured issuer, lifetime,
/// secret and algorithm.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    lifetime_seconds: i64,
    secret: SecretString,
    algorithm: TokenAlgorithm,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        issuer: String,
        lifetime_seconds: i64,
        secret: SecretString,
        algorithm: TokenAlgorithm,
    ) -> Self {
        Self {
            issuer,
            lifetime_seconds,
            secret,
            algorithm,
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    #[must_use]
    pub fn algorithm(&self) -> TokenAlgorithm {
        self.algorithm
    }

    /// Issue a token for `identifier` valid from now for the configured lifetime.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signing fails.
    pub fn generate_token(&self, identifier: &str) -> Result<String, TokenError> {
        self.generate_token_at(identifier, unix_now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signing fails.
    pub fn generate_token_at(&self, identifier: &str, now: i64) -> Result<String, TokenError> {
        let claims = TokenClaims {
            iss: self.issuer.clone(),
            iat: now,
            exp: now.saturating_add(self.lifetime_seconds),
            sub: identifier.to_string(),
            jti: Some(Ulid::new().to_string()),
        };
        self.sign_claims(&claims)
    }

    /// Sign arbitrary claims with the configured secret and algorithm.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signing fails.
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let header = TokenHeader {
            alg: self.algorithm.as_str().to_string(),
            typ: "JWT".to_string(),
        };
        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(claims)?);
        let signature = self
            .algorithm
            .sign(self.secret.expose_secret().as_bytes(), signing_input.as_bytes())?;

        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, signed with another key or
    /// algorithm, issued by someone else, or expired.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, unix_now())
    }

    /// Verify a token against the clock value `now`.
    ///
    /// # Errors
    /// See [`TokenIssuer::decode`].
    pub fn decode_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != self.algorithm.as_str() {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        self.algorithm.verify(
            self.secret.expose_secret().as_bytes(),
            signing_input.as_bytes(),
            &signature,
        )?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.iss != self.issuer {
            return Err(TokenError::InvalidIssuer);
        }
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("lifetime_seconds", &self.lifetime_seconds)
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

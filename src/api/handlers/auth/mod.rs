//! Authentication: credential verification, token lifecycle and sessions.
//!
//! ## Tokens
//!
//! Login issues an HMAC-signed JWT whose subject is the principal name
//! (`admin`, the service name, or the directory user name). The registry keeps
//! exactly one live token per principal, so a new login invalidates the
//! previous token even though its signature is still valid.
//!
//! Expired tokens are evicted lazily, when validation finds them.
//!
//! ## Sessions
//!
//! A successful login also creates a server-side session, referenced by the
//! `account_session` cookie. The session marks whether the caller is the
//! administrator or a service account and is what `POST /user` checks.

mod error;
pub(crate) mod gate;
pub(crate) mod login;
pub(crate) mod logout;
mod principal;
mod registry;
mod session;
mod state;
mod token;
pub(crate) mod types;
mod utils;
mod validate;
mod verifier;

pub use error::AuthError;
pub use login::LoggedIn;
pub use principal::{ADMIN_ID, ADMIN_NAME, Identity, Principal};
pub use registry::{InMemoryTokenRegistry, IssuedToken, TokenRegistry};
pub use session::{SESSION_COOKIE_NAME, Session, SessionRole, SessionStore};
pub use state::{AdminConfig, AuthState};
pub use token::{
    DEFAULT_TOKEN_ISSUER, DEFAULT_TOKEN_LIFETIME_SECONDS, TokenAlgorithm, TokenClaims, TokenError,
    TokenIssuer,
};
pub use utils::{X_TOKEN_HEADER, sha256_hex, valid_digest};
pub use validate::ValidationError;
pub use verifier::{AdminVerifier, CredentialVerifier, LdapVerifier, ServiceVerifier};

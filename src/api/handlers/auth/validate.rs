//! Bearer token validation.
//!
//! A token is valid when it is the registered token of its subject, its
//! signature and issuer check out, it has not expired, and for directory users
//! a portal user record exists. Only expiry mutates the registry.

use tracing::{debug, warn};

use super::{
    principal::{Identity, Principal},
    session::{Session, SessionRole},
    state::AuthState,
    token::{TokenError, unix_now},
};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("token is not registered")]
    Unknown,
    #[error("malformed token: {0}")]
    Malformed(TokenError),
    #[error("token expired")]
    Expired,
    #[error("no user record for {0}")]
    UserNotFound(String),
    #[error("account store failure: {0}")]
    Store(anyhow::Error),
}

impl AuthState {
    /// Validate `token` and resolve the identity behind it.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] describing why the token was rejected.
    pub async fn validate(
        &self,
        token: &str,
        session: Option<&Session>,
    ) -> Result<Identity, ValidationError> {
        self.validate_at(token, session, unix_now()).await
    }

    /// [`AuthState::validate`] against an explicit clock.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] describing why the token was rejected.
    pub async fn validate_at(
        &self,
        token: &str,
        session: Option<&Session>,
        now: i64,
    ) -> Result<Identity, ValidationError> {
        let Some(name) = self.registry().name_for(token).await else {
            debug!("token not in registry");
            return Err(ValidationError::Unknown);
        };

        let claims = match self.issuer().decode_at(token, now) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                if self.registry().remove_if_current(&name, token).await {
                    debug!("evicted expired token of {name}");
                }
                return Err(ValidationError::Expired);
            }
            Err(err) => {
                warn!("rejected registered token of {name}: {err}");
                return Err(ValidationError::Malformed(err));
            }
        };

        if claims.sub != name {
            warn!("token subject {} does not match registry entry {name}", claims.sub);
            return Err(ValidationError::Unknown);
        }

        // A concurrent login may have replaced the token since the lookup.
        let issued = match self.registry().get(&name).await {
            Some(issued) if issued.token == token => issued,
            _ => return Err(ValidationError::Unknown),
        };

        match session.filter(|session| session.username == name) {
            Some(session) => match session.role {
                SessionRole::Admin { .. } => Ok(Identity::Admin),
                SessionRole::Service { id } => Ok(Identity::Service { id, name }),
                SessionRole::User => self.resolve_user(name).await,
            },
            None => match issued.principal {
                Principal::Admin => Ok(Identity::Admin),
                Principal::Service { id, name } => Ok(Identity::Service { id, name }),
                Principal::User { name } => self.resolve_user(name).await,
            },
        }
    }

    async fn resolve_user(&self, name: String) -> Result<Identity, ValidationError> {
        match self.store().user_by_dom_name(&name).await {
            Ok(Some(user)) => Ok(Identity::User {
                id: user.id,
                dom_name: user.dom_name,
            }),
            Ok(None) => Err(ValidationError::UserNotFound(name)),
            Err(err) => Err(ValidationError::Store(err)),
        }
    }
}

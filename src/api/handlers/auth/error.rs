//! Caller-facing error taxonomy for auth and account endpoints.
//!
//! Details stay in the logs; clients only see the status code, plus a message
//! for login conflicts and bad requests.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("token expired")]
    Expired,
    #[error("You are already logged in {0}")]
    Conflict(String),
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("internal error")]
    Internal,
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::Expired => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Expired => Self::Expired,
            _ => Self::Unauthenticated,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Conflict(_) | Self::BadRequest(_) => {
                (self.status(), self.to_string()).into_response()
            }
            _ => self.status().into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::token::TokenError;
    use anyhow::Result;

    #[tokio::test]
    async fn unauthenticated_and_expired_look_the_same() -> Result<()> {
        for err in [AuthError::Unauthenticated, AuthError::Expired] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
            assert!(body.is_empty());
        }
        Ok(())
    }

    #[tokio::test]
    async fn conflict_names_the_logged_in_user() -> Result<()> {
        let response = AuthError::Conflict("alice".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"You are already logged in alice");
        Ok(())
    }

    #[test]
    fn validation_errors_collapse_to_unauthorized() {
        let cases = [
            ValidationError::Unknown,
            ValidationError::Malformed(TokenError::InvalidSignature),
            ValidationError::Expired,
            ValidationError::UserNotFound("bob".to_string()),
            ValidationError::Store(anyhow::anyhow!("down")),
        ];
        for err in cases {
            assert_eq!(AuthError::from(err).status(), StatusCode::UNAUTHORIZED);
        }
    }
}

//! Login-required gate for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::{error::AuthError, state::AuthState, utils::extract_token};

/// Reject requests without a valid `X-TOKEN`.
///
/// The resolved [`Identity`](super::principal::Identity) is added to the
/// request extensions for the handler.
pub async fn require_token(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return AuthError::Unauthenticated.into_response();
    };

    let session = auth_state
        .current_session(request.headers())
        .await
        .map(|(_, session)| session);

    match auth_state.validate(&token, session.as_ref()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            debug!("gate rejected request: {err}");
            AuthError::from(err).into_response()
        }
    }
}

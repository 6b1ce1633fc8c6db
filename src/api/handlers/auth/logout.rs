use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    session::{clear_session_cookie, extract_session_id},
    state::AuthState,
    token::TokenError,
    utils::extract_token,
};

impl AuthState {
    /// Drop the session and its registry entry. Never fails.
    ///
    /// Without a session, a bearer token whose signature still verifies is
    /// removed from the registry instead, together with the sessions of its
    /// principal.
    pub async fn logout(&self, session_id: Option<&str>, bearer: Option<&str>) {
        let session = match session_id {
            Some(id) => self.sessions().remove(id).await,
            None => None,
        };
        if let Some(session) = session {
            self.registry().remove(&session.username).await;
            info!("{} logged out", session.username);
            return;
        }

        let Some(token) = bearer else {
            return;
        };
        let Some(name) = self.registry().name_for(token).await else {
            debug!("logout with unregistered token");
            return;
        };
        match self.issuer().decode(token) {
            Ok(_) | Err(TokenError::Expired) => {
                if self.registry().remove_if_current(&name, token).await {
                    let dropped = self.sessions().remove_user(&name).await;
                    info!("{name} logged out, {dropped} session(s) dropped");
                }
            }
            Err(err) => debug!("logout token rejected: {err}"),
        }
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let session_id = extract_session_id(&headers);
    let bearer = extract_token(&headers);
    auth_state
        .logout(session_id.as_deref(), bearer.as_deref())
        .await;

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie());
    (StatusCode::OK, response_headers)
}

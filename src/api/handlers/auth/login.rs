//! Login: try each credential verifier in order and issue a token.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{
    error::AuthError,
    principal::Principal,
    session::{Session, session_cookie},
    state::AuthState,
    types::{LoginRequest, LoginResponse},
};

/// Token and session created by a successful login.
#[derive(Debug)]
pub struct LoggedIn {
    pub principal: Principal,
    pub token: String,
    pub session_id: String,
}

impl AuthState {
    /// Authenticate `username`/`password` and register a fresh token.
    ///
    /// Nothing is changed when a session already exists or no verifier
    /// recognises the credentials.
    ///
    /// # Errors
    /// `Conflict` when already logged in, `Unauthenticated` when no verifier
    /// matched, `Internal` when the token or session cannot be created.
    pub async fn login(
        &self,
        current: Option<&Session>,
        username: &str,
        password: &str,
    ) -> Result<LoggedIn, AuthError> {
        if let Some(session) = current {
            return Err(AuthError::Conflict(session.username.clone()));
        }

        let mut principal = None;
        for verifier in self.verifiers() {
            match verifier.attempt(username, password).await {
                Ok(Some(found)) => {
                    principal = Some(found);
                    break;
                }
                Ok(None) => {}
                Err(err) => error!("{} verifier failed: {err:#}", verifier.name()),
            }
        }
        let Some(principal) = principal else {
            warn!("login rejected for {username}");
            return Err(AuthError::Unauthenticated);
        };

        let token = self.issuer().generate_token(principal.name()).map_err(|err| {
            error!("Failed to sign token: {err}");
            AuthError::Internal
        })?;

        let session_id = self
            .sessions()
            .create(Session::for_principal(&principal))
            .await
            .map_err(|err| {
                error!("Failed to create session: {err:#}");
                AuthError::Internal
            })?;

        self.registry().set(principal.clone(), token.clone()).await;
        info!("{} logged in", principal.name());

        Ok(LoggedIn {
            principal,
            token,
            session_id,
        })
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Invalid credentials"),
        (status = 409, description = "Already logged in", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return AuthError::BadRequest(rejection.body_text()).into_response(),
    };

    let current = auth_state.current_session(&headers).await;
    let logged_in = match auth_state
        .login(
            current.as_ref().map(|(_, session)| session),
            &request.username,
            &request.password,
        )
        .await
    {
        Ok(logged_in) => logged_in,
        Err(err) => return err.into_response(),
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(&logged_in.session_id, auth_state.issuer().lifetime_seconds()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    (
        StatusCode::OK,
        response_headers,
        Json(LoginResponse {
            token: logged_in.token,
        }),
    )
        .into_response()
}

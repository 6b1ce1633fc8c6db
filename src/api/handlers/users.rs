use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::auth::{AuthError, AuthState, Identity};
use crate::{
    store::{AccountStore, NewUser, User},
    totp::{self, TOTP_ISSUER},
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub dom_name: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    /// `otpauth://` provisioning URI derived from the stored seed.
    pub seed: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct NewUserRequest {
    pub dom_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Portal record of the authenticated principal.
pub(super) async fn current_user(
    store: &dyn AccountStore,
    identity: &Identity,
) -> Result<User, AuthError> {
    match store.user_by_dom_name(identity.name()).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!("user {} not found", identity.name());
            Err(AuthError::NotFound)
        }
        Err(err) => {
            error!("Failed to look up user {}: {err:#}", identity.name());
            Err(AuthError::Internal)
        }
    }
}

#[utoipa::path(
    get,
    path = "/user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Current user has no portal record")
    ),
    security(("token" = [])),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn get_user(auth_state: Extension<Arc<AuthState>>, identity: Extension<Identity>) -> Response {
    let user = match current_user(auth_state.store().as_ref(), &identity).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let seed = match totp::provisioning_uri(&user.seed, &user.dom_name, TOTP_ISSUER) {
        Ok(uri) => uri,
        Err(err) => {
            error!("Failed to build provisioning URI for {}: {err:#}", user.dom_name);
            return AuthError::Internal.into_response();
        }
    };

    Json(UserResponse {
        id: user.id,
        dom_name: user.dom_name,
        full_name: user.full_name,
        email: user.email,
        seed,
    })
    .into_response()
}

#[utoipa::path(
    post,
    path = "/user",
    request_body = NewUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Admin session and admin token required"),
        (status = 500, description = "User could not be stored")
    ),
    security(("token" = [])),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn add_user(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    identity: Extension<Identity>,
    payload: Result<Json<NewUserRequest>, JsonRejection>,
) -> Response {
    // Both the session and the token must belong to the administrator.
    let admin_session = auth_state
        .current_session(&headers)
        .await
        .is_some_and(|(_, session)| session.is_admin());
    if !admin_session || *identity != Identity::Admin {
        warn!("add_user refused for {}", identity.name());
        return AuthError::Unauthenticated.into_response();
    }

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return AuthError::BadRequest(rejection.body_text()).into_response(),
    };
    if request.dom_name.trim().is_empty() {
        return AuthError::BadRequest("dom_name must not be empty".to_string()).into_response();
    }

    let seed = match totp::generate_seed() {
        Ok(seed) => seed,
        Err(err) => {
            error!("Failed to generate TOTP seed: {err:#}");
            return AuthError::Internal.into_response();
        }
    };

    let new_user = NewUser {
        dom_name: request.dom_name,
        full_name: request.full_name,
        email: request.email,
        seed,
    };
    let dom_name = new_user.dom_name.clone();
    match auth_state.store().insert_user(new_user).await {
        Ok(id) => {
            info!("created user {dom_name} with id {id}");
            StatusCode::CREATED.into_response()
        }
        Err(err) => {
            error!("error while creating account {dom_name}: {err:#}");
            AuthError::Internal.into_response()
        }
    }
}

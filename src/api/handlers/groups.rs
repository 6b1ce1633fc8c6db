use axum::{
    Json,
    extract::{Extension, Query},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{
    auth::{AuthError, AuthState, Identity},
    users::current_user,
};
use crate::store::GroupMembership;

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct GroupsQuery {
    /// Only groups the user administers.
    #[serde(default)]
    pub admin: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GroupResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<GroupMembership> for GroupResponse {
    fn from(membership: GroupMembership) -> Self {
        Self {
            id: membership.group.id,
            name: membership.group.name,
            description: membership.group.description,
        }
    }
}

#[utoipa::path(
    get,
    path = "/groups",
    params(GroupsQuery),
    responses(
        (status = 200, description = "Groups of the current user", body = [GroupResponse]),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Current user has no portal record")
    ),
    security(("token" = [])),
    tag = "account"
)]
#[instrument(skip_all, fields(admin = query.admin))]
pub async fn find_groups(
    auth_state: Extension<Arc<AuthState>>,
    identity: Extension<Identity>,
    query: Query<GroupsQuery>,
) -> Response {
    let user = match current_user(auth_state.store().as_ref(), &identity).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match auth_state.store().group_memberships(user.id).await {
        Ok(memberships) => {
            let groups: Vec<GroupResponse> = memberships
                .into_iter()
                .filter(|membership| !query.admin || membership.admin)
                .map(GroupResponse::from)
                .collect();
            Json(groups).into_response()
        }
        Err(err) => {
            error!("Failed to list groups of {}: {err:#}", user.dom_name);
            AuthError::Internal.into_response()
        }
    }
}

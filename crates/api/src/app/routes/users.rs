use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use chrono::Utc;

use storefront_auth::{RenameUser, User, UserCommand};
use storefront_infra::projections::{USER_AGGREGATE_TYPE, UserReadModel};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// GET /users/me
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<UserReadModel>, ApiError> {
    services
        .users()
        .get(&principal.user_id())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user"))
}

/// PUT /users/me - change the caller's display name.
pub async fn rename_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::RenameRequest>, JsonRejection>,
) -> Result<Json<UserReadModel>, ApiError> {
    let Json(body) = payload?;
    let user_id = principal.user_id();

    services.dispatch::<User>(
        user_id.into(),
        USER_AGGREGATE_TYPE,
        UserCommand::Rename(RenameUser { user_id, name: body.name, occurred_at: Utc::now() }),
        |id| User::empty(id.into()),
    )?;

    me(Extension(services), Extension(principal)).await
}

//! Admin routes for user management.
//!
//! An administrator can never demote or delete their own account, so the
//! system always keeps at least the acting admin.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use storefront_auth::{DeleteUser, Permission, SetAdmin, User, UserCommand};
use storefront_core::UserId;
use storefront_infra::projections::{USER_AGGREGATE_TYPE, UserReadModel};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/users/:id/admin", put(set_admin))
}

fn dispatch(services: &AppServices, user_id: UserId, cmd: UserCommand) -> Result<(), ApiError> {
    services.dispatch::<User>(user_id.into(), USER_AGGREGATE_TYPE, cmd, |id| User::empty(id.into()))?;
    Ok(())
}

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<dto::Items<UserReadModel>>, ApiError> {
    require(&principal, Permission::USERS_ADMIN)?;
    Ok(Json(services.users().list().into()))
}

/// POST /admin/users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, Permission::USERS_ADMIN)?;
    let Json(body) = payload?;

    let user = services
        .register_user(&body.name, &body.email, &body.password, body.is_admin)
        .await?;
    tracing::info!(user_id = %user.id, created_by = %principal.user_id(), "user created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /admin/users/:id/admin
pub async fn set_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::SetAdminRequest>, JsonRejection>,
) -> Result<Json<UserReadModel>, ApiError> {
    require(&principal, Permission::USERS_ADMIN)?;
    let user_id = dto::parse_user_id(&id)?;
    let Json(body) = payload?;

    if user_id == principal.user_id() && !body.is_admin {
        return Err(ApiError::Invariant("administrators cannot demote themselves".to_string()));
    }

    dispatch(
        &services,
        user_id,
        UserCommand::SetAdmin(SetAdmin { user_id, is_admin: body.is_admin, occurred_at: Utc::now() }),
    )?;
    tracing::info!(%user_id, is_admin = body.is_admin, changed_by = %principal.user_id(), "admin flag changed");

    services
        .users()
        .get(&user_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user"))
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&principal, Permission::USERS_ADMIN)?;
    let user_id = dto::parse_user_id(&id)?;

    if user_id == principal.user_id() {
        return Err(ApiError::Invariant("administrators cannot delete themselves".to_string()));
    }

    dispatch(&services, user_id, UserCommand::Delete(DeleteUser { user_id, occurred_at: Utc::now() }))?;
    tracing::info!(%user_id, deleted_by = %principal.user_id(), "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

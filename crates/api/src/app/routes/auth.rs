//! Public account endpoints: self-registration and login.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// POST /register - create a seller account and sign it in.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let user = services
        .register_user(&body.name, &body.email, &body.password, false)
        .await?;
    let session = services.issue_session(user)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let user = services.authenticate(&body.email, &body.password)?;
    tracing::info!(user_id = %user.id, "login");
    Ok(Json(services.issue_session(user)?))
}

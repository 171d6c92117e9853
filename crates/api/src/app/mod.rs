//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (event store, projections, dispatcher)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Multipart framing and text fields on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: ApiConfig) -> Result<Router, errors::ApiError> {
    let body_limit = config.max_image_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    let bootstrap = config.bootstrap_admin.clone();

    let services = Arc::new(services::AppServices::new(config));
    if let Some(admin) = &bootstrap {
        services.bootstrap_admin(admin).await?;
    }

    let auth_state = middleware::AuthState { services: services.clone() };

    // Protected routes: bearer token resolved to a live user.
    let protected = routes::router()
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(Extension(services.clone()));

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .layer(Extension(services));

    Ok(Router::new()
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(body_limit))))
}

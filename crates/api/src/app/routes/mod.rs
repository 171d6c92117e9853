use axum::{routing::get, Router};

pub mod admin;
pub mod auth;
pub mod custom_lists;
pub mod products;
pub mod sales;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/users/me", get(users::me).put(users::rename_me))
        .nest("/products", products::router())
        .nest("/custom-lists", custom_lists::router())
        .nest("/sales", sales::router())
        .nest("/admin", admin::router())
}

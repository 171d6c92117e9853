//! Curated product lists.
//!
//! Sellers see lists that are public, shared with them, or that they own; a
//! list they cannot see answers 404 rather than 403.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;

use storefront_auth::Permission;
use storefront_core::AggregateId;
use storefront_infra::projections::{LIST_AGGREGATE_TYPE, ListReadModel};
use storefront_lists::{
    AddProduct, CreateList, CustomList, DeleteList, ListCommand, ListId, RemoveProduct, ShareWith,
    Unshare, UpdateList,
};
use storefront_products::ProductId;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_lists).post(create_list))
        .route("/:id", get(get_list).put(update_list).delete(delete_list))
        .route("/:id/products", post(add_product))
        .route("/:id/products/:product_id", delete(remove_product))
        .route("/:id/share", post(share_list))
        .route("/:id/share/:user_id", delete(unshare_list))
}

fn dispatch(services: &AppServices, list_id: ListId, cmd: ListCommand) -> Result<(), ApiError> {
    services.dispatch::<CustomList>(list_id.0, LIST_AGGREGATE_TYPE, cmd, |id| {
        CustomList::empty(ListId::new(id))
    })?;
    Ok(())
}

fn visible_list(services: &AppServices, principal: &PrincipalContext, raw_id: &str) -> Result<ListReadModel, ApiError> {
    let list_id = ListId::new(dto::parse_id(raw_id, "list")?);
    services
        .lists()
        .get(&list_id)
        .filter(|l| l.visible_to(principal.user_id(), principal.is_admin()))
        .ok_or_else(|| ApiError::not_found("list"))
}

fn ensure_product(services: &AppServices, product_id: ProductId) -> Result<(), ApiError> {
    services
        .products()
        .get(&product_id)
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound(format!("product {product_id} not found")))
}

fn detail(services: &AppServices, list: ListReadModel) -> dto::ListDetail {
    let products = list
        .product_ids
        .iter()
        .filter_map(|id| services.products().get(id))
        .collect();
    dto::ListDetail { list, products }
}

fn reload(services: &AppServices, list_id: ListId) -> Result<dto::ListDetail, ApiError> {
    let list = services
        .lists()
        .get(&list_id)
        .ok_or_else(|| ApiError::not_found("list"))?;
    Ok(detail(services, list))
}

/// GET /custom-lists
pub async fn list_lists(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<dto::Items<ListReadModel>>, ApiError> {
    require(&principal, Permission::LISTS_READ)?;
    let lists = services
        .lists()
        .list_visible(principal.user_id(), principal.is_admin());
    Ok(Json(lists.into()))
}

/// GET /custom-lists/:id
pub async fn get_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<dto::ListDetail>, ApiError> {
    require(&principal, Permission::LISTS_READ)?;
    let list = visible_list(&services, &principal, &id)?;
    Ok(Json(detail(&services, list)))
}

/// POST /custom-lists - admin only.
pub async fn create_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::CreateListRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let Json(body) = payload?;

    for product_id in &body.product_ids {
        ensure_product(&services, *product_id)?;
    }
    for user_id in &body.shared_with {
        if services.users().get(user_id).is_none() {
            return Err(ApiError::NotFound(format!("user {user_id} not found")));
        }
    }

    let list_id = ListId::new(AggregateId::new());
    let cmd = ListCommand::Create(CreateList {
        list_id,
        owner: principal.user_id(),
        name: body.name,
        description: body.description,
        product_ids: body.product_ids,
        shared_with: body.shared_with,
        is_public: body.is_public,
        occurred_at: Utc::now(),
    });
    dispatch(&services, list_id, cmd)?;

    tracing::info!(%list_id, user_id = %principal.user_id(), "custom list created");
    Ok((StatusCode::CREATED, Json(reload(&services, list_id)?)))
}

/// PUT /custom-lists/:id - admin only.
pub async fn update_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateListRequest>, JsonRejection>,
) -> Result<Json<dto::ListDetail>, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let list_id = ListId::new(dto::parse_id(&id, "list")?);
    let Json(body) = payload?;

    let cmd = ListCommand::Update(UpdateList {
        list_id,
        name: body.name,
        description: body.description,
        is_public: body.is_public,
        occurred_at: Utc::now(),
    });
    dispatch(&services, list_id, cmd)?;
    Ok(Json(reload(&services, list_id)?))
}

/// DELETE /custom-lists/:id - admin only.
pub async fn delete_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let list_id = ListId::new(dto::parse_id(&id, "list")?);

    dispatch(&services, list_id, ListCommand::Delete(DeleteList { list_id, occurred_at: Utc::now() }))?;
    tracing::info!(%list_id, user_id = %principal.user_id(), "custom list deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /custom-lists/:id/products
pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::ListProductRequest>, JsonRejection>,
) -> Result<Json<dto::ListDetail>, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let list_id = ListId::new(dto::parse_id(&id, "list")?);
    let Json(body) = payload?;
    ensure_product(&services, body.product_id)?;

    let cmd = ListCommand::AddProduct(AddProduct {
        list_id,
        product_id: body.product_id,
        occurred_at: Utc::now(),
    });
    dispatch(&services, list_id, cmd)?;
    Ok(Json(reload(&services, list_id)?))
}

/// DELETE /custom-lists/:id/products/:product_id
pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<dto::ListDetail>, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let list_id = ListId::new(dto::parse_id(&id, "list")?);
    let product_id = ProductId::new(dto::parse_id(&product_id, "product")?);

    let cmd = ListCommand::RemoveProduct(RemoveProduct { list_id, product_id, occurred_at: Utc::now() });
    dispatch(&services, list_id, cmd)?;
    Ok(Json(reload(&services, list_id)?))
}

/// POST /custom-lists/:id/share
pub async fn share_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::ShareRequest>, JsonRejection>,
) -> Result<Json<dto::ListDetail>, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let list_id = ListId::new(dto::parse_id(&id, "list")?);
    let Json(body) = payload?;
    if services.users().get(&body.user_id).is_none() {
        return Err(ApiError::not_found("user"));
    }

    let cmd = ListCommand::Share(ShareWith { list_id, user_id: body.user_id, occurred_at: Utc::now() });
    dispatch(&services, list_id, cmd)?;
    Ok(Json(reload(&services, list_id)?))
}

/// DELETE /custom-lists/:id/share/:user_id
pub async fn unshare_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<dto::ListDetail>, ApiError> {
    require(&principal, Permission::LISTS_WRITE)?;
    let list_id = ListId::new(dto::parse_id(&id, "list")?);
    let user_id = dto::parse_user_id(&user_id)?;

    let cmd = ListCommand::Unshare(Unshare { list_id, user_id, occurred_at: Utc::now() });
    dispatch(&services, list_id, cmd)?;
    Ok(Json(reload(&services, list_id)?))
}

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Extension, Multipart, Path, Query,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use storefront_auth::Permission;
use storefront_core::{AggregateId, Money};
use storefront_infra::images::{StoredImage, is_allowed_image_type};
use storefront_infra::projections::{PRODUCT_AGGREGATE_TYPE, ProductReadModel};
use storefront_products::{
    AttachImage, Category, CreateProduct, DeleteProduct, Product, ProductCommand, ProductId,
    UpdateProduct,
};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/:id/image", get(get_image).put(replace_image))
        .route("/:id/stock", post(adjust_stock))
}

fn dispatch(services: &AppServices, product_id: ProductId, cmd: ProductCommand) -> Result<(), ApiError> {
    services.dispatch::<Product>(product_id.0, PRODUCT_AGGREGATE_TYPE, cmd, |id| {
        Product::empty(ProductId::new(id))
    })?;
    Ok(())
}

/// Drop an image whose product command did not go through.
fn discard_image(services: &AppServices, product_id: ProductId) {
    if let Err(e) = services.images().remove(&product_id) {
        tracing::warn!(%product_id, error = %e, "failed to discard orphaned image");
    }
}

fn load(services: &AppServices, product_id: ProductId) -> Result<ProductReadModel, ApiError> {
    services
        .products()
        .get(&product_id)
        .ok_or_else(|| ApiError::not_found("product"))
}

/// Text fields and the optional image of a product form.
#[derive(Debug, Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    image: Option<StoredImage>,
}

impl ProductForm {
    async fn read(mut multipart: Multipart, max_image_bytes: usize) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if bytes.is_empty() {
                    continue;
                }
                if !is_allowed_image_type(&content_type) {
                    return Err(ApiError::validation(format!("unsupported image type '{content_type}'")));
                }
                if bytes.len() > max_image_bytes {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "image exceeds {max_image_bytes} bytes"
                    )));
                }
                form.image = Some(StoredImage { content_type, bytes: bytes.to_vec() });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn required(&self, field: &str) -> Result<&str, ApiError> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::validation(format!("{field} is required")))
    }

    fn parsed<T: core::str::FromStr>(&self, field: &str) -> Result<T, ApiError> {
        self.required(field)?
            .parse()
            .map_err(|_| ApiError::validation(format!("{field} must be a non-negative whole number")))
    }
}

/// POST /products (multipart) - admin only.
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, Permission::PRODUCTS_WRITE)?;

    let form = ProductForm::read(multipart?, services.config().max_image_bytes).await?;
    let name = form.required("name")?.to_string();
    let description = form.required("description")?.to_string();
    let price = Money::from_minor(form.parsed::<u64>("price")?);
    let quantity = form.parsed::<u32>("quantity")?;
    let category: Category = form.required("category")?.parse()?;

    let product_id = ProductId::new(AggregateId::new());
    let image = form
        .image
        .map(|img| services.images().put(product_id, img))
        .transpose()?;

    let cmd = ProductCommand::CreateProduct(CreateProduct {
        product_id,
        name,
        description,
        price,
        quantity,
        category,
        image,
        occurred_at: Utc::now(),
    });
    if let Err(e) = dispatch(&services, product_id, cmd) {
        discard_image(&services, product_id);
        return Err(e);
    }

    tracing::info!(%product_id, user_id = %principal.user_id(), "product created");
    Ok((StatusCode::CREATED, Json(load(&services, product_id)?)))
}

/// GET /products[?category=]
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::ProductsQuery>, QueryRejection>,
) -> Result<Json<dto::Items<ProductReadModel>>, ApiError> {
    require(&principal, Permission::PRODUCTS_READ)?;
    let Query(query) = query?;

    let category = query
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<Category>)
        .transpose()?;

    Ok(Json(services.products().list(category).into()))
}

/// GET /products/:id
pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<ProductReadModel>, ApiError> {
    require(&principal, Permission::PRODUCTS_READ)?;
    let product_id = ProductId::new(dto::parse_id(&id, "product")?);
    Ok(Json(load(&services, product_id)?))
}

/// GET /products/:id/image
pub async fn get_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, Permission::PRODUCTS_READ)?;
    let product_id = ProductId::new(dto::parse_id(&id, "product")?);
    let image = services
        .images()
        .get(&product_id)
        .ok_or_else(|| ApiError::not_found("image"))?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes))
}

/// PUT /products/:id/image (multipart `image` part) - admin only.
pub async fn replace_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProductReadModel>, ApiError> {
    require(&principal, Permission::PRODUCTS_WRITE)?;
    let product_id = ProductId::new(dto::parse_id(&id, "product")?);
    load(&services, product_id)?;

    let form = ProductForm::read(multipart?, services.config().max_image_bytes).await?;
    let image = form.image.ok_or_else(|| ApiError::validation("image is required"))?;
    let previous = services.images().get(&product_id);

    let path = services.images().put(product_id, image)?;
    let cmd = ProductCommand::AttachImage(AttachImage { product_id, image: path, occurred_at: Utc::now() });
    if let Err(e) = dispatch(&services, product_id, cmd) {
        match previous {
            Some(prev) => {
                if let Err(restore) = services.images().put(product_id, prev) {
                    tracing::warn!(%product_id, error = %restore, "failed to restore previous image");
                }
            }
            None => discard_image(&services, product_id),
        }
        return Err(e);
    }

    Ok(Json(load(&services, product_id)?))
}

/// PUT /products/:id - admin only; absent fields are left unchanged.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductReadModel>, ApiError> {
    require(&principal, Permission::PRODUCTS_WRITE)?;
    let product_id = ProductId::new(dto::parse_id(&id, "product")?);
    let Json(body) = payload?;

    let category = body.category.as_deref().map(str::parse::<Category>).transpose()?;
    let cmd = ProductCommand::UpdateProduct(UpdateProduct {
        product_id,
        name: body.name,
        description: body.description,
        price: body.price.map(Money::from_minor),
        quantity: body.quantity,
        category,
        occurred_at: Utc::now(),
    });

    let _guard = services.lock_writes().await;
    dispatch(&services, product_id, cmd)?;
    tracing::info!(%product_id, user_id = %principal.user_id(), "product updated");
    Ok(Json(load(&services, product_id)?))
}

/// POST /products/:id/stock - admin only.
pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> Result<Json<ProductReadModel>, ApiError> {
    require(&principal, Permission::PRODUCTS_WRITE)?;
    let product_id = ProductId::new(dto::parse_id(&id, "product")?);
    let Json(body) = payload?;

    let _guard = services.lock_writes().await;
    services.adjust_stock(product_id, body.delta)?;
    tracing::info!(%product_id, delta = body.delta, "stock adjusted");
    Ok(Json(load(&services, product_id)?))
}

/// DELETE /products/:id - admin only.
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&principal, Permission::PRODUCTS_WRITE)?;
    let product_id = ProductId::new(dto::parse_id(&id, "product")?);

    let _guard = services.lock_writes().await;
    dispatch(
        &services,
        product_id,
        ProductCommand::DeleteProduct(DeleteProduct { product_id, occurred_at: Utc::now() }),
    )?;
    services.images().remove(&product_id)?;

    tracing::info!(%product_id, user_id = %principal.user_id(), "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

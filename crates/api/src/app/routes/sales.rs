use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use storefront_auth::Permission;
use storefront_core::UserId;
use storefront_infra::projections::SALE_AGGREGATE_TYPE;
use storefront_sales::{DeleteSale, Sale, SaleCommand, SaleId, SaleRecord, SalesSummary};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{allows, require};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(register_sale))
        .route("/summary", get(summary))
        .route("/:id", get(get_sale).delete(delete_sale))
}

/// Which seller's sales the caller may read. `None` means everyone's.
fn seller_scope(principal: &PrincipalContext, requested: Option<UserId>) -> Result<Option<UserId>, ApiError> {
    if allows(principal, Permission::SALES_READ_ALL) {
        return Ok(requested);
    }
    match requested {
        Some(user_id) if user_id != principal.user_id() => {
            Err(ApiError::Forbidden("sellers can only read their own sales".to_string()))
        }
        _ => Ok(Some(principal.user_id())),
    }
}

/// POST /sales - the caller is the seller.
pub async fn register_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::RegisterSaleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, Permission::SALES_CREATE)?;
    let Json(body) = payload?;

    let items: Vec<_> = body.items.iter().map(|i| (i.product_id, i.quantity)).collect();
    let record = services.register_sale(principal.user_id(), &items).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /sales[?user_id=]
pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::SalesQuery>, QueryRejection>,
) -> Result<Json<dto::Items<SaleRecord>>, ApiError> {
    require(&principal, Permission::SALES_READ)?;
    let Query(query) = query?;

    let scope = seller_scope(&principal, query.user_id)?;
    Ok(Json(services.sales().list(scope).into()))
}

/// GET /sales/:id - other sellers' sales read as missing.
pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SaleRecord>, ApiError> {
    require(&principal, Permission::SALES_READ)?;
    let sale_id = SaleId::new(dto::parse_id(&id, "sale")?);

    services
        .sales()
        .get(&sale_id)
        .filter(|s| s.user_id == principal.user_id() || allows(&principal, Permission::SALES_READ_ALL))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("sale"))
}

/// DELETE /sales/:id - admin only. Sold units are not returned to stock.
pub async fn delete_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&principal, Permission::SALES_DELETE)?;
    let sale_id = SaleId::new(dto::parse_id(&id, "sale")?);

    services.dispatch::<Sale>(
        sale_id.0,
        SALE_AGGREGATE_TYPE,
        SaleCommand::Delete(DeleteSale { sale_id, occurred_at: Utc::now() }),
        |id| Sale::empty(SaleId::new(id)),
    )?;

    tracing::info!(%sale_id, user_id = %principal.user_id(), "sale deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sales/summary[?user_id=]
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::SalesQuery>, QueryRejection>,
) -> Result<Json<dto::SummaryResponse>, ApiError> {
    require(&principal, Permission::SALES_READ)?;
    let Query(query) = query?;

    let scope = seller_scope(&principal, query.user_id)?;
    let records = services.sales().list(scope);
    Ok(Json(dto::SummaryResponse {
        summary: SalesSummary::from_records(&records),
        commission_rate_bps: services.config().commission.rate_bps,
    }))
}

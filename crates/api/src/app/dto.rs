use serde::{Deserialize, Serialize};

use storefront_core::{AggregateId, UserId};
use storefront_infra::projections::{ListReadModel, ProductReadModel};
use storefront_products::ProductId;
use storefront_sales::SalesSummary;

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

/// Partial product update; prices are in minor units.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub quantity: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
    #[serde(default)]
    pub shared_with: Vec<UserId>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListProductRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSaleRequest {
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub user_id: Option<UserId>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// A custom list with its products resolved; products deleted since they
/// were added are left out.
#[derive(Debug, Serialize)]
pub struct ListDetail {
    #[serde(flatten)]
    pub list: ListReadModel,
    pub products: Vec<ProductReadModel>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub commission_rate_bps: u32,
}

// -------------------------
// Helpers
// -------------------------

pub fn parse_id(raw: &str, what: &str) -> Result<AggregateId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("invalid {what} id")))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation("invalid user id"))
}

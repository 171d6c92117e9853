//! Edit form for an existing product.
//!
//! Starts from the product as fetched and sends only the fields that
//! differ. Validation matches the creation form.

use storefront_products::Category;

use crate::api::StorefrontApi;
use crate::error::{ClientError, Result};
use crate::types::{Product, ProductUpdate};
use crate::views::BusyFlag;
use crate::views::product_form::{field_errors, parse_price};

#[derive(Debug)]
pub struct ProductEditForm {
    original: Product,
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
    pub category: String,
    submitting: BusyFlag,
}

impl ProductEditForm {
    pub fn new(product: Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            quantity: product.quantity.to_string(),
            category: product.category.as_str().to_string(),
            original: product,
            submitting: BusyFlag::default(),
        }
    }

    pub fn product(&self) -> &Product {
        &self.original
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    pub fn errors(&self) -> Vec<String> {
        field_errors(&self.name, &self.description, &self.price, &self.quantity, &self.category)
    }

    /// Validated difference from the original product.
    pub fn changes(&self) -> Result<ProductUpdate> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors.join("; ")));
        }

        let invalid = |msg: &str| ClientError::Validation(msg.to_string());
        let name = self.name.trim();
        let description = self.description.trim();
        let price = parse_price(&self.price).ok_or_else(|| invalid("invalid price"))?;
        let quantity: u32 = self.quantity.trim().parse().map_err(|_| invalid("invalid quantity"))?;
        let category: Category = self.category.parse().map_err(|_| invalid("invalid category"))?;

        let p = &self.original;
        Ok(ProductUpdate {
            name: (name != p.name).then(|| name.to_string()),
            description: (description != p.description).then(|| description.to_string()),
            price: (price != p.price).then_some(price),
            quantity: (quantity != p.quantity).then_some(quantity),
            category: (category != p.category).then_some(category),
        })
    }

    /// Validate and send the changed fields. A second submit while one is
    /// in flight is rejected.
    pub async fn submit(&self, api: &dyn StorefrontApi) -> Result<Product> {
        let update = self.changes()?;
        if update == ProductUpdate::default() {
            return Err(ClientError::Validation("nothing to update".to_string()));
        }
        let Some(_busy) = self.submitting.try_acquire() else {
            return Err(ClientError::Validation("already submitting".to_string()));
        };
        api.update_product(self.original.id, update).await
    }
}

//! Product creation form.
//!
//! Every field is validated locally; nothing is sent while any required
//! field is blank or malformed.

use storefront_core::Money;
use storefront_products::Category;

use crate::api::StorefrontApi;
use crate::error::{ClientError, Result};
use crate::types::{ImageUpload, NewProduct, Product};
use crate::views::BusyFlag;

/// Parse a price typed in major units ("12", "12.5", "12.50") into minor units.
pub fn parse_price(input: &str) -> Option<Money> {
    let input = input.trim();
    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    if whole.is_empty() || frac.len() > 2 || !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: u64 = whole.parse().ok()?;
    let cents: u64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let minor = whole.checked_mul(100)?.checked_add(cents)?;
    (minor > 0).then(|| Money::from_minor(minor))
}

#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
    pub category: String,
    pub image: Option<ImageUpload>,
    submitting: BusyFlag,
}

/// Problems with typed product fields, in field order.
pub(crate) fn field_errors(name: &str, description: &str, price: &str, quantity: &str, category: &str) -> Vec<String> {
    let mut errors = Vec::new();
    for (field, value) in [
        ("name", name),
        ("description", description),
        ("price", price),
        ("quantity", quantity),
        ("category", category),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field} is required"));
        }
    }
    if !price.trim().is_empty() && parse_price(price).is_none() {
        errors.push("price must be a positive amount with at most two decimals".to_string());
    }
    if !quantity.trim().is_empty() && quantity.trim().parse::<u32>().is_err() {
        errors.push("quantity must be a whole number".to_string());
    }
    if !category.trim().is_empty() && category.parse::<Category>().is_err() {
        errors.push(format!("unknown category '{}'", category.trim()));
    }
    errors
}

impl ProductForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    /// Every problem with the current input, in field order.
    pub fn errors(&self) -> Vec<String> {
        field_errors(&self.name, &self.description, &self.price, &self.quantity, &self.category)
    }

    pub fn validate(&self) -> Result<NewProduct> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors.join("; ")));
        }

        let invalid = |msg: &str| ClientError::Validation(msg.to_string());
        Ok(NewProduct {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price: parse_price(&self.price).ok_or_else(|| invalid("invalid price"))?,
            quantity: self.quantity.trim().parse().map_err(|_| invalid("invalid quantity"))?,
            category: self.category.parse().map_err(|_| invalid("invalid category"))?,
            image: self.image.clone(),
        })
    }

    /// Validate, then create the product. A second submit while one is in
    /// flight is rejected.
    pub async fn submit(&self, api: &dyn StorefrontApi) -> Result<Product> {
        let product = self.validate()?;
        let Some(_busy) = self.submitting.try_acquire() else {
            return Err(ClientError::Validation("already submitting".to_string()));
        };
        api.create_product(product).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockStorefrontApi;
    use crate::views::fixtures::product;

    fn filled() -> ProductForm {
        ProductForm {
            name: "Lamp".to_string(),
            description: "Desk lamp".to_string(),
            price: "40.00".to_string(),
            quantity: "2".to_string(),
            category: "Home".to_string(),
            ..ProductForm::default()
        }
    }

    #[tokio::test]
    async fn failed_request_releases_the_busy_flag() {
        let mut api = MockStorefrontApi::new();
        api.expect_create_product().times(1).returning(|_| panic!("connection reset"));

        let form = std::sync::Arc::new(filled());
        let task = {
            let form = form.clone();
            tokio::spawn(async move { form.submit(&api).await })
        };
        assert!(task.await.is_err());
        assert!(!form.is_submitting());

        let mut api = MockStorefrontApi::new();
        api.expect_create_product()
            .times(1)
            .returning(|p| Ok(product(&p.name, p.price.minor(), p.quantity)));
        assert!(form.submit(&api).await.is_ok());
    }

    #[test]
    fn prices_parse_to_minor_units() {
        assert_eq!(parse_price("12"), Some(Money::from_minor(1_200)));
        assert_eq!(parse_price("12.5"), Some(Money::from_minor(1_250)));
        assert_eq!(parse_price(" 0.99 "), Some(Money::from_minor(99)));
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("1.999"), None);
        assert_eq!(parse_price("-3"), None);
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price(".5"), None);
    }

    #[tokio::test]
    async fn blank_required_field_blocks_submission() {
        for field in ["name", "description", "price", "quantity", "category"] {
            let mut form = filled();
            match field {
                "name" => form.name = "  ".to_string(),
                "description" => form.description.clear(),
                "price" => form.price.clear(),
                "quantity" => form.quantity.clear(),
                _ => form.category.clear(),
            }

            let mut api = MockStorefrontApi::new();
            api.expect_create_product().times(0);

            let err = form.submit(&api).await.unwrap_err();
            assert!(matches!(err, ClientError::Validation(_)));
            assert!(err.to_string().contains(&format!("{field} is required")), "{err}");
        }
    }

    #[tokio::test]
    async fn valid_form_is_sent_in_minor_units() {
        let mut api = MockStorefrontApi::new();
        api.expect_create_product()
            .withf(|p| p.price == Money::from_minor(4_000) && p.category == Category::Home && p.quantity == 2)
            .times(1)
            .returning(|p| {
                let mut created = product(&p.name, p.price.minor(), p.quantity);
                created.description = p.description;
                Ok(created)
            });

        let form = filled();
        let created = form.submit(&api).await.unwrap();
        assert_eq!(created.name, "Lamp");
        assert!(!form.is_submitting());
    }
}

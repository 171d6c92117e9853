//! Typed access to every storefront endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use storefront_core::UserId;
use storefront_lists::ListId;
use storefront_products::{Category, ProductId};
use storefront_sales::SaleId;

use crate::credentials::CredentialStore;
use crate::error::{ClientError, Result};
use crate::types::{
    AuthSession, CustomList, CustomListDetail, ImageUpload, Items, ListUpdate, NewList, NewProduct,
    NewUser, Product, ProductImage, ProductUpdate, Sale, SaleItem, SummaryReport, User,
};

/// The storefront API as the client sees it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn health(&self) -> Result<()>;
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession>;
    async fn me(&self) -> Result<User>;
    async fn rename_me(&self, name: &str) -> Result<User>;

    async fn list_products(&self, category: Option<Category>) -> Result<Vec<Product>>;
    async fn get_product(&self, id: ProductId) -> Result<Product>;
    async fn create_product(&self, product: NewProduct) -> Result<Product>;
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product>;
    async fn product_image(&self, id: ProductId) -> Result<ProductImage>;
    async fn set_product_image(&self, id: ProductId, image: ImageUpload) -> Result<Product>;
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product>;
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    async fn list_custom_lists(&self) -> Result<Vec<CustomList>>;
    async fn get_custom_list(&self, id: ListId) -> Result<CustomListDetail>;
    async fn create_custom_list(&self, list: NewList) -> Result<CustomListDetail>;
    async fn update_custom_list(&self, id: ListId, update: ListUpdate) -> Result<CustomListDetail>;
    async fn delete_custom_list(&self, id: ListId) -> Result<()>;
    async fn add_list_product(&self, id: ListId, product_id: ProductId) -> Result<CustomListDetail>;
    async fn remove_list_product(&self, id: ListId, product_id: ProductId) -> Result<CustomListDetail>;
    async fn share_list(&self, id: ListId, user_id: UserId) -> Result<CustomListDetail>;
    async fn unshare_list(&self, id: ListId, user_id: UserId) -> Result<CustomListDetail>;

    async fn register_sale(&self, items: Vec<SaleItem>) -> Result<Sale>;
    async fn list_sales(&self, user_id: Option<UserId>) -> Result<Vec<Sale>>;
    async fn get_sale(&self, id: SaleId) -> Result<Sale>;
    async fn delete_sale(&self, id: SaleId) -> Result<()>;
    async fn sales_summary(&self, user_id: Option<UserId>) -> Result<SummaryReport>;

    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<User>;
    async fn delete_user(&self, id: UserId) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Turn a non-success response body into `ClientError::Api`.
fn api_error(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => ClientError::Api {
            status: status.as_u16(),
            code: err.error,
            message: err.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "http_error".to_string(),
            message: if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

/// reqwest-backed [`StorefrontApi`].
///
/// Authenticated calls read the bearer token from the credential store. A
/// 401 on such a call clears the store and yields `ClientError::Unauthorized`.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<String> {
        self.credentials
            .load()?
            .map(|c| c.token)
            .ok_or(ClientError::Unauthorized)
    }

    async fn check(&self, res: Response, authenticated: bool) -> Result<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        if status == StatusCode::UNAUTHORIZED && authenticated {
            tracing::warn!(url = %res.url(), "token rejected; clearing stored credentials");
            self.credentials.clear()?;
            return Err(ClientError::Unauthorized);
        }
        let body = res.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let res = req.bearer_auth(self.token()?).send().await?;
        self.check(res, true).await
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        Ok(self.send(req).await?.json().await?)
    }

    async fn public_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let res = self.check(req.send().await?, false).await?;
        Ok(res.json().await?)
    }

    async fn items<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>> {
        let page: Items<T> = self.json(req).await?;
        Ok(page.items)
    }
}

fn image_part(image: ImageUpload) -> Result<Part> {
    Ok(Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.content_type)?)
}

#[async_trait]
impl StorefrontApi for ApiClient {
    async fn health(&self) -> Result<()> {
        self.check(self.http.get(self.url("/health")).send().await?, false).await?;
        Ok(())
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let req = self
            .http
            .post(self.url("/register"))
            .json(&json!({"name": name, "email": email, "password": password}));
        self.public_json(req).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let req = self
            .http
            .post(self.url("/login"))
            .json(&json!({"email": email, "password": password}));
        self.public_json(req).await
    }

    async fn me(&self) -> Result<User> {
        self.json(self.http.get(self.url("/users/me"))).await
    }

    async fn rename_me(&self, name: &str) -> Result<User> {
        self.json(self.http.put(self.url("/users/me")).json(&json!({"name": name})))
            .await
    }

    async fn list_products(&self, category: Option<Category>) -> Result<Vec<Product>> {
        let mut req = self.http.get(self.url("/products"));
        if let Some(category) = category {
            req = req.query(&[("category", category.as_str())]);
        }
        self.items(req).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.json(self.http.get(self.url(&format!("/products/{id}")))).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut form = Form::new()
            .text("name", product.name)
            .text("description", product.description)
            .text("price", product.price.minor().to_string())
            .text("quantity", product.quantity.to_string())
            .text("category", product.category.as_str());
        if let Some(image) = product.image {
            form = form.part("image", image_part(image)?);
        }
        self.json(self.http.post(self.url("/products")).multipart(form)).await
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        self.json(self.http.put(self.url(&format!("/products/{id}"))).json(&update))
            .await
    }

    async fn product_image(&self, id: ProductId) -> Result<ProductImage> {
        let res = self.send(self.http.get(self.url(&format!("/products/{id}/image")))).await?;
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = res.bytes().await?.to_vec();
        Ok(ProductImage { content_type, bytes })
    }

    async fn set_product_image(&self, id: ProductId, image: ImageUpload) -> Result<Product> {
        let form = Form::new().part("image", image_part(image)?);
        self.json(self.http.put(self.url(&format!("/products/{id}/image"))).multipart(form))
            .await
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product> {
        let req = self
            .http
            .post(self.url(&format!("/products/{id}/stock")))
            .json(&json!({"delta": delta}));
        self.json(req).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.send(self.http.delete(self.url(&format!("/products/{id}")))).await?;
        Ok(())
    }

    async fn list_custom_lists(&self) -> Result<Vec<CustomList>> {
        self.items(self.http.get(self.url("/custom-lists"))).await
    }

    async fn get_custom_list(&self, id: ListId) -> Result<CustomListDetail> {
        self.json(self.http.get(self.url(&format!("/custom-lists/{id}")))).await
    }

    async fn create_custom_list(&self, list: NewList) -> Result<CustomListDetail> {
        self.json(self.http.post(self.url("/custom-lists")).json(&list)).await
    }

    async fn update_custom_list(&self, id: ListId, update: ListUpdate) -> Result<CustomListDetail> {
        self.json(self.http.put(self.url(&format!("/custom-lists/{id}"))).json(&update))
            .await
    }

    async fn delete_custom_list(&self, id: ListId) -> Result<()> {
        self.send(self.http.delete(self.url(&format!("/custom-lists/{id}")))).await?;
        Ok(())
    }

    async fn add_list_product(&self, id: ListId, product_id: ProductId) -> Result<CustomListDetail> {
        let req = self
            .http
            .post(self.url(&format!("/custom-lists/{id}/products")))
            .json(&json!({"product_id": product_id}));
        self.json(req).await
    }

    async fn remove_list_product(&self, id: ListId, product_id: ProductId) -> Result<CustomListDetail> {
        let req = self
            .http
            .delete(self.url(&format!("/custom-lists/{id}/products/{product_id}")));
        self.json(req).await
    }

    async fn share_list(&self, id: ListId, user_id: UserId) -> Result<CustomListDetail> {
        let req = self
            .http
            .post(self.url(&format!("/custom-lists/{id}/share")))
            .json(&json!({"user_id": user_id}));
        self.json(req).await
    }

    async fn unshare_list(&self, id: ListId, user_id: UserId) -> Result<CustomListDetail> {
        let req = self
            .http
            .delete(self.url(&format!("/custom-lists/{id}/share/{user_id}")));
        self.json(req).await
    }

    async fn register_sale(&self, items: Vec<SaleItem>) -> Result<Sale> {
        let req = self.http.post(self.url("/sales")).json(&json!({"items": items}));
        self.json(req).await
    }

    async fn list_sales(&self, user_id: Option<UserId>) -> Result<Vec<Sale>> {
        let mut req = self.http.get(self.url("/sales"));
        if let Some(user_id) = user_id {
            req = req.query(&[("user_id", user_id.to_string())]);
        }
        self.items(req).await
    }

    async fn get_sale(&self, id: SaleId) -> Result<Sale> {
        self.json(self.http.get(self.url(&format!("/sales/{id}")))).await
    }

    async fn delete_sale(&self, id: SaleId) -> Result<()> {
        self.send(self.http.delete(self.url(&format!("/sales/{id}")))).await?;
        Ok(())
    }

    async fn sales_summary(&self, user_id: Option<UserId>) -> Result<SummaryReport> {
        let mut req = self.http.get(self.url("/sales/summary"));
        if let Some(user_id) = user_id {
            req = req.query(&[("user_id", user_id.to_string())]);
        }
        self.json(req).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.items(self.http.get(self.url("/admin/users"))).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.json(self.http.post(self.url("/admin/users")).json(&user)).await
    }

    async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<User> {
        let req = self
            .http
            .put(self.url(&format!("/admin/users/{id}/admin")))
            .json(&json!({"is_admin": is_admin}));
        self.json(req).await
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        self.send(self.http.delete(self.url(&format!("/admin/users/{id}")))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_become_api_errors() {
        let err = api_error(StatusCode::CONFLICT, r#"{"error":"conflict","message":"insufficient stock"}"#);
        match err {
            ClientError::Api { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code, "conflict");
                assert_eq!(message, "insufficient stock");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_errors_keep_the_status() {
        let err = api_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[tokio::test]
    async fn authenticated_calls_need_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::FileCredentialStore::new(dir.path().join("c.json")));
        // Nothing listens here; the call must fail before any request is made.
        let client = ApiClient::new("http://127.0.0.1:9", store);

        assert!(matches!(client.me().await, Err(ClientError::Unauthorized)));
    }
}

//! Uploaded product images.
//!
//! Images are stored out of band from the event stream; the product only
//! records the URL path the image is served from.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use storefront_products::ProductId;

/// Accepted upload content types.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageStoreError {
    #[error("image store unavailable: {0}")]
    Unavailable(String),
}

fn poisoned<T>(_: T) -> ImageStoreError {
    ImageStoreError::Unavailable("lock poisoned".to_string())
}

/// URL path a product image is served from.
pub fn image_path(product_id: ProductId) -> String {
    format!("/products/{product_id}/image")
}

pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// In-memory image store keyed by product.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: RwLock<HashMap<ProductId, StoredImage>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a product image and return its URL path.
    pub fn put(&self, product_id: ProductId, image: StoredImage) -> Result<String, ImageStoreError> {
        self.images.write().map_err(poisoned)?.insert(product_id, image);
        Ok(image_path(product_id))
    }

    pub fn get(&self, product_id: &ProductId) -> Option<StoredImage> {
        self.images.read().ok()?.get(product_id).cloned()
    }

    pub fn remove(&self, product_id: &ProductId) -> Result<(), ImageStoreError> {
        self.images.write().map_err(poisoned)?.remove(product_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::AggregateId;

    fn png(bytes: Vec<u8>) -> StoredImage {
        StoredImage { content_type: "image/png".to_string(), bytes }
    }

    #[test]
    fn put_returns_serving_path() {
        let store = ImageStore::new();
        let id = ProductId::new(AggregateId::new());
        let path = store.put(id, png(vec![1, 2, 3])).unwrap();

        assert_eq!(path, format!("/products/{id}/image"));
        assert_eq!(store.get(&id).unwrap().bytes, vec![1, 2, 3]);

        store.remove(&id).unwrap();
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn poisoned_store_refuses_writes() {
        let store = std::sync::Arc::new(ImageStore::new());
        let id = ProductId::new(AggregateId::new());

        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.images.write().unwrap();
            panic!("writer died");
        })
        .join();

        assert!(matches!(store.put(id, png(vec![1])), Err(ImageStoreError::Unavailable(_))));
        assert!(store.remove(&id).is_err());
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn only_images_are_allowed() {
        assert!(is_allowed_image_type("image/png"));
        assert!(!is_allowed_image_type("application/pdf"));
    }
}

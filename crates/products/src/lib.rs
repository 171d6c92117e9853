//! Products domain module (event-sourced).
//!
//! Business rules for the product catalog, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;

pub use category::Category;
pub use product::{
    AdjustStock, AttachImage, CreateProduct, DeleteProduct, ImageAttached, Product,
    ProductCommand, ProductCreated, ProductDeleted, ProductEvent, ProductId, ProductUpdated,
    StockAdjusted, UpdateProduct,
};

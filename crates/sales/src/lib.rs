//! Sales domain module (event-sourced).
//!
//! Registered sales, the commission policy applied to them, and the per-user
//! aggregation used by summary screens. Pure domain logic: no IO, no HTTP.

pub mod commission;
pub mod sale;
pub mod summary;

pub use commission::CommissionPolicy;
pub use sale::{
    DeleteSale, RegisterSale, Sale, SaleCommand, SaleDeleted, SaleEvent, SaleId, SaleLine,
    SaleRegistered,
};
pub use summary::{SaleRecord, SalesSummary, UserSalesSummary};

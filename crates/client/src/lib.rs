//! `storefront-client`
//!
//! HTTP client and view models for the storefront API:
//! - `api`: the `StorefrontApi` trait and its reqwest implementation
//! - `credentials`: persisted login (`{token, user}`)
//! - `session`: start/login/register/logout flow
//! - `views`: per-screen view models with observable state
//!
//! The `storefront` binary is a thin CLI over the same pieces.

pub mod api;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod session;
pub mod types;
pub mod views;

pub use api::{ApiClient, StorefrontApi};
pub use credentials::{CredentialStore, FileCredentialStore, StoredCredentials};
pub use error::{ClientError, Result};
pub use session::{AppSession, Screen};

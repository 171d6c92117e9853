//! API-side authorization guard.
//!
//! Enforced at the handler boundary before any command is dispatched, so
//! domain aggregates and infra stay auth-agnostic.

use storefront_auth::authorize;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Require a permission for the current principal.
pub fn require(principal: &PrincipalContext, permission: &str) -> Result<(), ApiError> {
    authorize(principal.principal(), permission).map_err(|e| {
        tracing::warn!(user_id = %principal.user_id(), permission, "forbidden");
        ApiError::Forbidden(e.to_string())
    })
}

/// Whether the principal holds a permission; for scoping rather than rejecting.
pub fn allows(principal: &PrincipalContext, permission: &str) -> bool {
    authorize(principal.principal(), permission).is_ok()
}

use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &str) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(Permission::as_str).collect();

    if perms.contains(Permission::WILDCARD) || perms.contains(required) {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.user_id, permission = required, "authorization denied");
        Err(AuthzError::Forbidden(required.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::UserId;

    use super::*;
    use crate::Role;

    #[test]
    fn admin_is_authorized_for_anything() {
        let p = Principal::new(UserId::new(), "Ada", Role::for_user(true));
        assert!(authorize(&p, Permission::PRODUCTS_WRITE).is_ok());
        assert!(authorize(&p, "made.up").is_ok());
    }

    #[test]
    fn seller_is_forbidden_from_admin_actions() {
        let p = Principal::new(UserId::new(), "Sam", Role::for_user(false));
        assert!(authorize(&p, Permission::SALES_CREATE).is_ok());
        assert_eq!(
            authorize(&p, Permission::USERS_ADMIN),
            Err(AuthzError::Forbidden("users.admin".to_string()))
        );
    }
}

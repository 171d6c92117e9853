use storefront_auth::{Principal, Role};
use storefront_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; roles reflect the user's current admin
/// flag, not the one captured in the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, name: impl Into<String>, is_admin: bool) -> Self {
        Self {
            principal: Principal::new(user_id, name, Role::for_user(is_admin)),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn name(&self) -> &str {
        &self.principal.name
    }

    pub fn roles(&self) -> &[Role] {
        &self.principal.roles
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

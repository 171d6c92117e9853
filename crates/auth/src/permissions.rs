use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "products.read"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";

    pub const PRODUCTS_READ: &'static str = "products.read";
    pub const PRODUCTS_WRITE: &'static str = "products.write";
    pub const LISTS_READ: &'static str = "lists.read";
    pub const LISTS_WRITE: &'static str = "lists.write";
    pub const SALES_CREATE: &'static str = "sales.create";
    pub const SALES_READ: &'static str = "sales.read";
    pub const SALES_READ_ALL: &'static str = "sales.read_all";
    pub const SALES_DELETE: &'static str = "sales.delete";
    pub const USERS_ADMIN: &'static str = "users.admin";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role → permission policy.
///
/// `admin` grants `*`. `seller` may browse products and lists, register sales,
/// and read its own sales. Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(Role::is_admin) {
        return vec![Permission::new(Permission::WILDCARD)];
    }

    let mut perms = Vec::new();
    if roles.iter().any(|r| r.as_str() == Role::SELLER) {
        perms.extend(
            [
                Permission::PRODUCTS_READ,
                Permission::LISTS_READ,
                Permission::SALES_CREATE,
                Permission::SALES_READ,
            ]
            .into_iter()
            .map(Permission::new),
        );
    }
    perms
}

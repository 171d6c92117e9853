//! `storefront-auth` — authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it knows how to issue and
//! validate tokens, hash passwords, decide permissions, and model users.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtCodec, JwtError};
pub use password::{PasswordError, hash_password, verify_password};
pub use permissions::{Permission, permissions_for_roles};
pub use principal::Principal;
pub use roles::Role;
pub use user::{
    DeleteUser, RegisterUser, RenameUser, SetAdmin, User, UserAdminChanged, UserCommand,
    UserDeleted, UserEvent, UserRegistered, UserRenamed, normalize_email,
};

//! HS256 token issue/validation.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("failed to encode token: {0}")]
    Encode(String),

    #[error("malformed or tampered token: {0}")]
    Decode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Token codec seam used by the HTTP layer.
pub trait JwtCodec: Send + Sync {
    fn issue(&self, claims: &JwtClaims) -> Result<String, JwtError>;

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// Shared-secret (HMAC-SHA256) codec.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl JwtCodec for Hs256Jwt {
    fn issue(&self, claims: &JwtClaims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| JwtError::Decode(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use storefront_core::UserId;

    use super::*;
    use crate::Role;

    #[test]
    fn issued_token_validates_with_same_secret() {
        let codec = Hs256Jwt::new(b"secret");
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), "Ada", Role::for_user(true), now, Duration::hours(1));

        let token = codec.issue(&claims).unwrap();
        assert_eq!(codec.validate(&token, now).unwrap(), claims);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), "Ada", vec![], now, Duration::hours(1));
        let token = Hs256Jwt::new(b"one").issue(&claims).unwrap();

        let err = Hs256Jwt::new(b"two").validate(&token, now).unwrap_err();
        assert!(matches!(err, JwtError::Decode(_)));
    }

    #[test]
    fn expired_token_is_rejected_after_signature_check() {
        let codec = Hs256Jwt::new(b"secret");
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), "Ada", vec![], now, Duration::minutes(1));
        let token = codec.issue(&claims).unwrap();

        let err = codec.validate(&token, now + Duration::minutes(2)).unwrap_err();
        assert_eq!(err, JwtError::Claims(TokenValidationError::Expired));
    }
}

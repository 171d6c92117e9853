//! Server configuration from environment variables.

use thiserror::Error;

use storefront_sales::CommissionPolicy;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Administrator account created at startup when no user has that email yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `STOREFRONT_BIND`
    pub bind: String,
    /// `JWT_SECRET`
    pub jwt_secret: String,
    /// `STOREFRONT_TOKEN_TTL_MINUTES`
    pub token_ttl_minutes: i64,
    /// `STOREFRONT_COMMISSION_BPS`
    pub commission: CommissionPolicy,
    /// `STOREFRONT_MAX_IMAGE_BYTES`
    pub max_image_bytes: usize,
    /// `STOREFRONT_ADMIN_EMAIL` + `STOREFRONT_ADMIN_PASSWORD` (+ optional `STOREFRONT_ADMIN_NAME`)
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 24 * 60,
            commission: CommissionPolicy::default(),
            max_image_bytes: 5 * 1024 * 1024,
            bootstrap_admin: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });

        let token_ttl_minutes = match get("STOREFRONT_TOKEN_TTL_MINUTES") {
            Some(v) => {
                let minutes = parse_positive::<i64>("STOREFRONT_TOKEN_TTL_MINUTES", &v)?;
                if minutes > MAX_TOKEN_TTL_MINUTES {
                    return Err(invalid(
                        "STOREFRONT_TOKEN_TTL_MINUTES",
                        &v,
                        format!("must be at most {MAX_TOKEN_TTL_MINUTES}"),
                    ));
                }
                minutes
            }
            None => defaults.token_ttl_minutes,
        };

        let commission = match get("STOREFRONT_COMMISSION_BPS") {
            Some(v) => {
                let bps = v.trim().parse::<u32>().map_err(|e| invalid("STOREFRONT_COMMISSION_BPS", &v, e))?;
                CommissionPolicy::new(bps).map_err(|e| invalid("STOREFRONT_COMMISSION_BPS", &v, e))?
            }
            None => defaults.commission,
        };

        let max_image_bytes = match get("STOREFRONT_MAX_IMAGE_BYTES") {
            Some(v) => parse_positive::<usize>("STOREFRONT_MAX_IMAGE_BYTES", &v)?,
            None => defaults.max_image_bytes,
        };

        let bootstrap_admin = match (get("STOREFRONT_ADMIN_EMAIL"), get("STOREFRONT_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: get("STOREFRONT_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            (Some(email), None) => {
                return Err(invalid("STOREFRONT_ADMIN_PASSWORD", "", format!("required when STOREFRONT_ADMIN_EMAIL={email} is set")));
            }
            _ => None,
        };

        Ok(Self {
            bind: get("STOREFRONT_BIND").unwrap_or(defaults.bind),
            jwt_secret,
            token_ttl_minutes,
            commission,
            max_image_bytes,
            bootstrap_admin,
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES))
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr + PartialOrd + Default,
    T::Err: ToString,
{
    let parsed = value.trim().parse::<T>().map_err(|e| invalid(var, value, e))?;
    if parsed <= T::default() {
        return Err(invalid(var, value, "must be greater than zero"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.commission.rate_bps, 3_000);
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn token_ttl_is_bounded() {
        let year = MAX_TOKEN_TTL_MINUTES.to_string();
        let config = ApiConfig::from_lookup(lookup(&[("STOREFRONT_TOKEN_TTL_MINUTES", year.as_str())])).unwrap();
        assert_eq!(config.token_ttl(), chrono::Duration::days(365));

        let config = ApiConfig { token_ttl_minutes: i64::MAX, ..ApiConfig::default() };
        assert_eq!(config.token_ttl(), chrono::Duration::days(365));
    }

    #[test]
    fn reads_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("STOREFRONT_BIND", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("STOREFRONT_TOKEN_TTL_MINUTES", "15"),
            ("STOREFRONT_COMMISSION_BPS", "2500"),
            ("STOREFRONT_ADMIN_EMAIL", "root@example.com"),
            ("STOREFRONT_ADMIN_PASSWORD", "changeme"),
        ]))
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl_minutes, 15);
        assert_eq!(config.commission.rate_bps, 2_500);
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.email, "root@example.com");
        assert_eq!(admin.name, "Administrator");
    }

    #[test]
    fn rejects_bad_values() {
        let err = ApiConfig::from_lookup(lookup(&[("STOREFRONT_COMMISSION_BPS", "20000")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "STOREFRONT_COMMISSION_BPS", .. }));

        let err = ApiConfig::from_lookup(lookup(&[("STOREFRONT_TOKEN_TTL_MINUTES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "STOREFRONT_TOKEN_TTL_MINUTES", .. }));

        let err = ApiConfig::from_lookup(lookup(&[("STOREFRONT_TOKEN_TTL_MINUTES", "9223372036854775807")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "STOREFRONT_TOKEN_TTL_MINUTES", .. }));

        let err = ApiConfig::from_lookup(lookup(&[("STOREFRONT_ADMIN_EMAIL", "a@b.c")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "STOREFRONT_ADMIN_PASSWORD", .. }));
    }
}

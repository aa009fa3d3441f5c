//! Environment-driven settings.

use std::env;
use std::path::PathBuf;

use crate::import::pipeline::DEFAULT_FLUSH_EVERY;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_JWT_SECRET: &str = "internship-certificates-jwt-secret-change-in-production";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_VERIFICATION_BASE_URL: &str = "https://localhost:5000";
const DEFAULT_ISSUER_NAME: &str = "Certificate Issuing Authority";

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
    #[error("unable to hash default admin password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub flush_every: usize,
    pub jwt_secret: String,
    pub session_ttl_seconds: i64,
    pub admin_username: String,
    pub admin_password_hash: String,
    pub verification_base_url: String,
    pub issuer_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").filter(|url| url != MEMORY_DATABASE);

        let flush_every = match get("IMPORT_FLUSH_EVERY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("IMPORT_FLUSH_EVERY", raw)),
            },
            None => DEFAULT_FLUSH_EVERY,
        };

        let session_ttl_seconds = match get("SESSION_TTL_SECONDS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("SESSION_TTL_SECONDS", raw)),
            },
            None => DEFAULT_SESSION_TTL_SECONDS,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_SECRET not set, using default secret. SET THIS IN PRODUCTION!");
            DEFAULT_JWT_SECRET.to_string()
        });

        let admin_password_hash = match get("ADMIN_PASSWORD_HASH") {
            Some(hash) => hash,
            None => {
                log::warn!(
                    "ADMIN_PASSWORD_HASH not set, admin login uses the default password. SET THIS IN PRODUCTION!"
                );
                bcrypt::hash(DEFAULT_ADMIN_PASSWORD, bcrypt::DEFAULT_COST)?
            }
        };

        Ok(Self {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            upload_dir: PathBuf::from(
                get("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
            ),
            flush_every,
            jwt_secret,
            session_ttl_seconds,
            admin_username: get("ADMIN_USERNAME")
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password_hash,
            verification_base_url: get("VERIFICATION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_VERIFICATION_BASE_URL.to_string()),
            issuer_name: get("ISSUER_NAME").unwrap_or_else(|| DEFAULT_ISSUER_NAME.to_string()),
        })
    }
}

fn invalid(key: &str, value: String) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("ADMIN_PASSWORD_HASH", "$2b$04$stub")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.flush_every, 10);
        assert_eq!(config.session_ttl_seconds, 3600);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.verification_base_url, "https://localhost:5000");
    }

    #[test]
    fn test_memory_database_selects_in_process_store() {
        let config = config_from(&[
            ("DATABASE_URL", "memory"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$stub"),
        ])
        .unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_flush_interval_must_be_positive() {
        for bad in ["0", "ten", "-3"] {
            let err = config_from(&[
                ("IMPORT_FLUSH_EVERY", bad),
                ("ADMIN_PASSWORD_HASH", "$2b$04$stub"),
            ])
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { ref key, .. } if key == "IMPORT_FLUSH_EVERY"),
                "value {bad}"
            );
        }
        let config = config_from(&[
            ("IMPORT_FLUSH_EVERY", "25"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$stub"),
        ])
        .unwrap();
        assert_eq!(config.flush_every, 25);
    }

    #[test]
    fn test_default_admin_hash_verifies_default_password() {
        let config = config_from(&[]).unwrap();
        assert!(bcrypt::verify("admin123", &config.admin_password_hash).unwrap());
    }
}

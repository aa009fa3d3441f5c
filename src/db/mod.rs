//! Application state and database wiring.
//!
//! - `postgres` - PostgreSQL implementation of [`CertificateStore`]

mod postgres;

pub use postgres::PgCertificateStore;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthPolicy, SessionIssuer, StaticCredentialPolicy};
use crate::config::AppConfig;
use crate::import::ImportSettings;
use crate::store::{CertificateStore, MemoryStore};
use crate::verification::VerificationComposer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CertificateStore>,
    pub auth: Arc<dyn AuthPolicy>,
    pub sessions: SessionIssuer,
    pub verification: VerificationComposer,
    pub config: AppConfig,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::new_with_config(config).await
    }

    pub async fn new_with_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn CertificateStore> = match &config.database_url {
            Some(database_url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(20)
                    .acquire_timeout(Duration::from_secs(30))
                    .idle_timeout(Duration::from_secs(900))
                    .connect(database_url)
                    .await?;
                let store = PgCertificateStore::new(pool);
                store.ensure_schema().await?;
                log::info!("Connected to PostgreSQL");
                Arc::new(store)
            }
            None => {
                log::warn!("DATABASE_URL not set, records are kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let auth = Arc::new(StaticCredentialPolicy::new(
            config.admin_username.clone(),
            config.admin_password_hash.clone(),
        ));
        Ok(Self::with_parts(config, store, auth))
    }

    /// Assemble state from already-built parts.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn CertificateStore>,
        auth: Arc<dyn AuthPolicy>,
    ) -> Self {
        let sessions = SessionIssuer::new(config.jwt_secret.clone(), config.session_ttl_seconds);
        let verification =
            VerificationComposer::new(config.verification_base_url.clone(), config.issuer_name.clone());
        Self {
            store,
            auth,
            sessions,
            verification,
            config,
        }
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            flush_every: self.config.flush_every,
        }
    }
}

use async_trait::async_trait;

use super::model::AuthError;

/// Decides who may operate the service. Injected into `AppState`.
#[async_trait]
pub trait AuthPolicy: Send + Sync {
    /// Returns the authenticated principal's name.
    async fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError>;
}

/// A single administrator whose password is kept as a bcrypt hash.
pub struct StaticCredentialPolicy {
    username: String,
    password_hash: String,
}

impl StaticCredentialPolicy {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }
}

#[async_trait]
impl AuthPolicy for StaticCredentialPolicy {
    async fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username != self.username {
            return Err(AuthError::InvalidCredentials);
        }
        let password = password.to_string();
        let hash = self.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| {
                log::error!("password verification task failed: {:?}", e);
                AuthError::InvalidCredentials
            })?
            .unwrap_or(false);
        if valid {
            Ok(self.username.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::model::{AuthError, SessionClaims, ACCESS_TOKEN_TYPE};

/// Signs and checks session tokens with a secret it owns.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: String,
    ttl_seconds: i64,
}

impl SessionIssuer {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Generate access token
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: username.to_string(),
            exp: now + self.ttl_seconds as usize,
            iat: now,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Validate and decode a token
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let token_data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        if token_data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AuthError::WrongTokenType);
        }
        Ok(token_data.claims)
    }
}

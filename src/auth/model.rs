use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Login request payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

/// Token response after successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // username
    pub exp: usize,
    pub iat: usize,
    pub token_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid token type")]
    WrongTokenType,
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

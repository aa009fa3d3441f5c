use actix_web::error::ErrorUnauthorized;
use actix_web::{Error, HttpRequest};

use super::jwt::SessionIssuer;
use super::model::SessionClaims;

/// Extract token from Authorization header
fn extract_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

/// Validate token from HttpRequest and return claims
pub fn validate_request_token(
    req: &HttpRequest,
    sessions: &SessionIssuer,
) -> Result<SessionClaims, Error> {
    let token =
        extract_token(req).ok_or_else(|| ErrorUnauthorized("Missing authorization token"))?;

    sessions.validate(token).map_err(|e| {
        log::warn!("Token validation failed: {:?}", e);
        ErrorUnauthorized("Invalid or expired token")
    })
}

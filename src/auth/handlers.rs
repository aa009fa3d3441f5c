use actix_web::{web, HttpResponse, Responder};

use super::model::{AuthError, LoginRequest, TokenResponse};
use crate::AppState;

/// Login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::ErrorResponse)
    )
)]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    let username = match state.auth.authenticate(&body.username, &body.password).await {
        Ok(username) => username,
        Err(AuthError::InvalidCredentials) => {
            log::warn!("Failed login attempt for {}", body.username);
            return HttpResponse::Unauthorized().json(crate::ErrorResponse::new(
                "Unauthorized",
                "Invalid username or password",
            ));
        }
        Err(e) => {
            log::error!("Login failed: {:?}", e);
            return HttpResponse::InternalServerError()
                .json(crate::ErrorResponse::internal_error("Login failed"));
        }
    };

    let access_token = match state.sessions.issue(&username) {
        Ok(t) => t,
        Err(e) => {
            log::error!("Failed to generate access token: {:?}", e);
            return HttpResponse::InternalServerError().json(crate::ErrorResponse::internal_error(
                "Failed to generate token",
            ));
        }
    };

    HttpResponse::Ok().json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.ttl_seconds(),
    })
}

/// Configure auth routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auth").route("/login", web::post().to(login)));
}

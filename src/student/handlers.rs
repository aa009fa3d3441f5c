use actix_web::{web, HttpRequest, HttpResponse, Responder};

use super::model::{CertificateStatus, DashboardStats, StatusCount};
use crate::auth::validate_request_token;
use crate::store::StoreError;
use crate::verification::VerificationPayload;
use crate::{AppState, ErrorResponse};

async fn load_dashboard_stats(state: &AppState) -> Result<DashboardStats, StoreError> {
    let total_students = state.store.count_students().await?;
    let counts = state.store.certificate_status_counts().await?;
    let status_distribution = CertificateStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: counts
                .iter()
                .find(|(s, _)| s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0),
        })
        .collect();
    Ok(DashboardStats {
        total_students,
        status_distribution,
    })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Students",
    get,
    path = "/dashboard_stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Student totals", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn get_dashboard_stats(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    if let Err(e) = validate_request_token(&req, &state.sessions) {
        return e.error_response();
    }

    match load_dashboard_stats(&state).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            log::error!("Failed to load dashboard stats: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to load dashboard stats"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Verification",
    get,
    path = "/qr-data/{certificate_id}",
    params(("certificate_id" = String, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Verification payload", body = VerificationPayload),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn get_qr_data(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let certificate_id = path.into_inner();
    match state.store.find_student_by_certificate_id(&certificate_id).await {
        Ok(Some(student)) => {
            HttpResponse::Ok().json(state.verification.compose(&certificate_id, Some(&student)))
        }
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Certificate {} not found",
            certificate_id
        ))),
        Err(e) => {
            log::error!("Failed to look up certificate {}: {}", certificate_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to look up certificate"))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard_stats", web::get().to(get_dashboard_stats))
        .route("/qr-data/{certificate_id}", web::get().to(get_qr_data));
}

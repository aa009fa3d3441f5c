use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::model::BatchUpload;
use super::multipart_parser::MultipartParser;
use crate::auth::validate_request_token;
use crate::import::{ImportOutcome, ImportPipeline, ImportReport};
use crate::storage::UploadStorage;
use crate::{AppState, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub batch_id: Uuid,
    pub report: ImportReport,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadBatchRequest {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Marks a batch whose file never got past the column check as failed.
async fn fail_rejected_batch(state: &AppState, batch_id: Uuid, reason: &str) {
    let mut batch = match state.store.load_batch(batch_id).await {
        Ok(Some(batch)) => batch,
        Ok(None) => return,
        Err(e) => {
            log::error!("Failed to load batch {}: {}", batch_id, e);
            return;
        }
    };
    if batch.status.is_terminal() {
        return;
    }
    if let Err(e) = batch.fail(&[], reason) {
        log::error!("batch {}: {}", batch_id, e);
        return;
    }
    if let Err(e) = state.store.save_batch(&batch).await {
        log::error!("Failed to mark batch {} as failed: {}", batch_id, e);
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Batch Import",
    post,
    path = "/batches",
    request_body(content = inline(UploadBatchRequest), content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Spreadsheet imported", body = UploadResponse),
        (status = 400, description = "File rejected", body = UploadResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Import aborted", body = UploadResponse)
    )
)]
pub async fn upload_batch(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> impl Responder {
    let claims = match validate_request_token(&req, &state.sessions) {
        Ok(c) => c,
        Err(e) => return e.error_response(),
    };

    let upload = match MultipartParser::parse_upload(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            log::warn!("Rejected upload: {}", e);
            return HttpResponse::from(e);
        }
    };

    let storage = UploadStorage::new(state.config.upload_dir.clone());
    let path = match storage.save(&upload.filename, upload.data).await {
        Ok(path) => path,
        Err(e) => {
            log::error!("Failed to store upload {}: {}", upload.filename, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to store uploaded file"));
        }
    };

    let batch = BatchUpload::new(upload.filename.clone(), Some(claims.sub));
    if let Err(e) = state.store.create_batch(&batch).await {
        log::error!("Failed to create batch record: {}", e);
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error("Failed to create batch record"));
    }
    log::info!("Created batch {} for {}", batch.id, upload.filename);

    let report = ImportPipeline::new(state.store.as_ref(), state.import_settings())
        .run_file(batch.id, &path)
        .await;

    let mut response = match report.outcome {
        ImportOutcome::Completed | ImportOutcome::CompletedWithErrors => HttpResponse::Ok(),
        ImportOutcome::Rejected => {
            let reason = report.error.clone().unwrap_or_default();
            fail_rejected_batch(&state, batch.id, &reason).await;
            HttpResponse::BadRequest()
        }
        ImportOutcome::AbortedAfterProgress | ImportOutcome::AbortedBeforeProgress => {
            HttpResponse::InternalServerError()
        }
    };
    response.json(UploadResponse {
        batch_id: batch.id,
        report,
    })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Batch Import",
    get,
    path = "/upload_progress/{batch_id}",
    params(("batch_id" = Uuid, Path, description = "Batch ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Batch progress", body = BatchUpload),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Batch not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn get_upload_progress(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    if let Err(e) = validate_request_token(&req, &state.sessions) {
        return e.error_response();
    }

    let batch_id = path.into_inner();
    match state.store.load_batch(batch_id).await {
        Ok(Some(batch)) => HttpResponse::Ok().json(batch),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Batch with id {} not found",
            batch_id
        ))),
        Err(e) => {
            log::error!("Failed to load batch {}: {}", batch_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to load batch"))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/batches", web::post().to(upload_batch))
        .route("/upload_progress/{batch_id}", web::get().to(get_upload_progress));
}

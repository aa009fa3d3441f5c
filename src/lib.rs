use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod batch;
pub mod config;
pub mod db;
pub mod delivery;
pub mod import;
pub mod storage;
pub mod store;
pub mod student;
pub mod verification;

pub use crate::db::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::handlers::login,
        crate::batch::handlers::upload_batch,
        crate::batch::handlers::get_upload_progress,
        crate::student::handlers::get_dashboard_stats,
        crate::student::handlers::get_qr_data
    ),
    components(
        schemas(
            auth::model::LoginRequest,
            auth::model::TokenResponse,
            batch::model::BatchUpload,
            batch::model::BatchStatus,
            batch::handlers::UploadResponse,
            batch::handlers::UploadBatchRequest,
            import::ImportReport,
            import::ImportOutcome,
            student::model::StudentRecord,
            student::model::CertificateStatus,
            student::model::DashboardStats,
            student::model::StatusCount,
            verification::VerificationPayload,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Session tokens for operators."),
        (name = "Batch Import", description = "Spreadsheet uploads and import progress."),
        (name = "Students", description = "Imported student records."),
        (name = "Verification", description = "Public certificate verification.")
    )
)]
pub struct ApiDoc;

/// Routes mounted under `/api`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth::handlers::config)
        .configure(batch::handlers::config)
        .configure(student::handlers::config);
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_state = match AppState::new().await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise application state. Check DATABASE_URL and the other settings in .env. Error: {}", e);
            std::process::exit(1);
        }
    };

    let bind_addr = app_state.config.bind_addr.clone();
    log::info!("Starting server at http://{}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(app_state.clone())
            .service(web::scope("/api").configure(configure_api))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind_addr)?
    .run()
    .await
}

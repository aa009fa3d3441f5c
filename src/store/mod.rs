//! Persistence port for students and batch uploads.
//!
//! The import pipeline and the delivery flow only talk to [`CertificateStore`];
//! `db::PgCertificateStore` backs it with PostgreSQL and [`MemoryStore`] keeps
//! everything in process.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::batch::model::BatchUpload;
use crate::student::model::{CertificateStatus, NewStudent, StudentRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule (roll number or certificate id) rejected the write.
    #[error("{0} already exists")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(
                db.constraint()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "record".to_string()),
            ),
            sqlx::Error::RowNotFound => StoreError::NotFound(error.to_string()),
            _ => StoreError::Database(error.to_string()),
        }
    }
}

#[async_trait]
pub trait CertificateStore: Send + Sync {
    async fn find_student_by_roll_number(
        &self,
        roll_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError>;

    async fn find_student_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<StudentRecord>, StoreError>;

    /// Persist every student or none of them.
    async fn insert_students(
        &self,
        students: &[NewStudent],
    ) -> Result<Vec<StudentRecord>, StoreError>;

    async fn update_certificate_status(
        &self,
        student_id: Uuid,
        status: CertificateStatus,
    ) -> Result<(), StoreError>;

    async fn count_students(&self) -> Result<i64, StoreError>;

    async fn certificate_status_counts(
        &self,
    ) -> Result<Vec<(CertificateStatus, i64)>, StoreError>;

    async fn create_batch(&self, batch: &BatchUpload) -> Result<(), StoreError>;

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchUpload>, StoreError>;

    async fn save_batch(&self, batch: &BatchUpload) -> Result<(), StoreError>;
}

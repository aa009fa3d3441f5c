//! Spreadsheet import: reading, row validation and the batch pipeline.

pub mod certificate_id;
pub mod dates;
pub mod headers;
pub mod pipeline;
pub mod row;
pub mod table;

use uuid::Uuid;

use crate::batch::model::{BatchStatus, BatchStatusError};
use crate::store::StoreError;

pub use certificate_id::{candidate_certificate_id, CertificateIdGenerator};
pub use headers::{normalize_header, validate_columns, MissingColumns};
pub use pipeline::{ImportOutcome, ImportPipeline, ImportReport, ImportSettings};
pub use row::{RowError, RowValidator, StudentDraft};
pub use table::{read_table, CellValue, Table, TableError};

/// Failures that stop a whole import rather than a single row.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Batch upload record not found: {0}")]
    BatchNotFound(Uuid),
    #[error("Batch {id} has already been processed (status: {status})")]
    BatchAlreadyStarted { id: Uuid, status: BatchStatus },
    #[error(transparent)]
    Schema(#[from] MissingColumns),
    #[error("Error reading spreadsheet: {0}")]
    Table(#[from] TableError),
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Status(#[from] BatchStatusError),
}

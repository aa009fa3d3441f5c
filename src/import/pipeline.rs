//! Batch import orchestration.
//!
//! One run owns one pending [`BatchUpload`]: it checks the sheet's columns,
//! walks the rows in file order, stages valid students and flushes them to the
//! store every `flush_every` rows. Row problems are recorded and counted; only
//! a store failure outside a flush stops the run.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use utoipa::ToSchema;
use uuid::Uuid;

use super::certificate_id::CertificateIdGenerator;
use super::headers::{normalize_headers, validate_columns};
use super::row::{RowCells, RowError, RowValidator};
use super::table::{read_table, CellValue, Table};
use super::ImportError;
use crate::batch::model::{BatchStatus, BatchUpload};
use crate::store::{CertificateStore, StoreError};
use crate::student::model::NewStudent;

pub const DEFAULT_FLUSH_EVERY: usize = 10;

/// The header occupies the first sheet row, so data row `i` (0-based) is shown
/// to users as row `HEADER_ROW + i + 1`.
const HEADER_ROW: usize = 1;

#[derive(Debug, Clone, Copy)]
pub struct ImportSettings {
    /// Rows handled between two flushes of staged students.
    pub flush_every: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    Completed,
    CompletedWithErrors,
    /// Refused before any row was touched: unknown batch, bad file, missing columns.
    Rejected,
    /// Stopped by a store failure after some students were saved.
    AbortedAfterProgress,
    /// Stopped by a store failure before any student was saved.
    AbortedBeforeProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    pub outcome: ImportOutcome,
    pub processed: i32,
    pub successful: i32,
    pub failed: i32,
    /// Row-scoped messages, each prefixed with its sheet row number.
    pub errors: Vec<String>,
    /// Batch-level failure, if any.
    pub error: Option<String>,
}

impl ImportReport {
    pub fn success(&self) -> bool {
        matches!(
            self.outcome,
            ImportOutcome::Completed | ImportOutcome::CompletedWithErrors
        )
    }

    fn rejected(error: &ImportError) -> Self {
        Self {
            outcome: ImportOutcome::Rejected,
            processed: 0,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

struct StagedStudent {
    display_row: usize,
    student: NewStudent,
}

/// Working set of one run.
struct ImportRun {
    batch: BatchUpload,
    successful: i32,
    failed: i32,
    errors: Vec<String>,
    pending: Vec<StagedStudent>,
    staged_rolls: HashSet<String>,
    certificate_ids: CertificateIdGenerator,
}

impl ImportRun {
    fn new(batch: BatchUpload) -> Self {
        Self {
            batch,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
            pending: Vec::new(),
            staged_rolls: HashSet::new(),
            certificate_ids: CertificateIdGenerator::new(),
        }
    }

    fn processed(&self) -> i32 {
        self.successful + self.failed
    }

    fn reject(&mut self, display_row: usize, error: RowError) {
        let message = format!("Row {}: {}", display_row, error);
        log::warn!("batch {}: {}", self.batch.id, message);
        self.errors.push(message);
        self.failed += 1;
    }

    fn stage(&mut self, display_row: usize, student: NewStudent) {
        self.staged_rolls.insert(student.roll_number.clone());
        self.pending.push(StagedStudent {
            display_row,
            student,
        });
        self.successful += 1;
    }

    /// Move every unsaved row from successful to failed.
    fn discard_pending(&mut self, reason: &str) {
        for staged in std::mem::take(&mut self.pending) {
            self.staged_rolls.remove(&staged.student.roll_number);
            self.certificate_ids.release(&staged.student.certificate_id);
            self.errors
                .push(format!("Row {}: {}", staged.display_row, reason));
            self.successful -= 1;
            self.failed += 1;
        }
    }

    fn sync_progress(&mut self) {
        self.batch.record_progress(self.successful, self.failed);
    }

    fn report(&self, outcome: ImportOutcome, error: Option<String>) -> ImportReport {
        ImportReport {
            outcome,
            processed: self.processed(),
            successful: self.successful,
            failed: self.failed,
            errors: self.errors.clone(),
            error,
        }
    }
}

pub struct ImportPipeline<'a> {
    store: &'a dyn CertificateStore,
    settings: ImportSettings,
    today: NaiveDate,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(store: &'a dyn CertificateStore, settings: ImportSettings) -> Self {
        Self {
            store,
            settings,
            today: Local::now().date_naive(),
        }
    }

    /// Date used for defaulted issue dates and generated certificate ids.
    pub fn with_processing_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn run_file(&self, batch_id: Uuid, path: &Path) -> ImportReport {
        let batch = match self.load_pending_batch(batch_id).await {
            Ok(batch) => batch,
            Err(e) => return self.reject(e),
        };
        match read_table(path) {
            Ok(table) => self.import(batch, table).await,
            Err(e) => self.reject(ImportError::Table(e)),
        }
    }

    pub async fn run_table(&self, batch_id: Uuid, table: Table) -> ImportReport {
        match self.load_pending_batch(batch_id).await {
            Ok(batch) => self.import(batch, table).await,
            Err(e) => self.reject(e),
        }
    }

    fn reject(&self, error: ImportError) -> ImportReport {
        log::error!("import rejected: {}", error);
        ImportReport::rejected(&error)
    }

    async fn load_pending_batch(&self, batch_id: Uuid) -> Result<BatchUpload, ImportError> {
        let batch = self
            .store
            .load_batch(batch_id)
            .await?
            .ok_or(ImportError::BatchNotFound(batch_id))?;
        if batch.status != BatchStatus::Pending {
            return Err(ImportError::BatchAlreadyStarted {
                id: batch_id,
                status: batch.status,
            });
        }
        Ok(batch)
    }

    async fn import(&self, mut batch: BatchUpload, table: Table) -> ImportReport {
        let headers = normalize_headers(&table.headers);
        if let Err(missing) = validate_columns(&headers) {
            return self.reject(ImportError::Schema(missing));
        }

        if let Err(e) = batch.start(table.len() as i32) {
            return self.reject(e.into());
        }
        if let Err(e) = self.store.save_batch(&batch).await {
            return self.reject(e.into());
        }
        log::info!(
            "batch {}: importing {} rows from {}",
            batch.id,
            table.len(),
            batch.filename
        );

        let validator = RowValidator::new(self.today);
        let flush_every = self.settings.flush_every.max(1) as i32;
        let mut run = ImportRun::new(batch);

        for index in 0..table.len() {
            let display_row = HEADER_ROW + index + 1;
            let cells = table.row(index);

            if let Err(e) = self.process_row(&mut run, &validator, &cells, display_row).await {
                return self.abort(run, e.into()).await;
            }

            run.sync_progress();
            if let Err(e) = self.store.save_batch(&run.batch).await {
                return self.abort(run, e.into()).await;
            }

            if run.processed() % flush_every == 0 {
                if let Err(e) = self.flush(&mut run).await {
                    return self.abort(run, e.into()).await;
                }
            }
        }

        if let Err(e) = self.flush(&mut run).await {
            return self.abort(run, e.into()).await;
        }

        if let Err(e) = run.batch.finish(&run.errors) {
            return self.abort(run, e.into()).await;
        }
        if let Err(e) = self.store.save_batch(&run.batch).await {
            return self.abort(run, e.into()).await;
        }

        log::info!(
            "batch {}: successfully processed {} out of {} records",
            run.batch.id,
            run.successful,
            run.processed()
        );

        let outcome = if run.failed == 0 {
            ImportOutcome::Completed
        } else {
            ImportOutcome::CompletedWithErrors
        };
        run.report(outcome, None)
    }

    /// Row problems are recorded on `run`; an `Err` means the store itself failed.
    async fn process_row(
        &self,
        run: &mut ImportRun,
        validator: &RowValidator,
        cells: &[(&str, &CellValue)],
        display_row: usize,
    ) -> Result<(), StoreError> {
        if let Some(roll_number) = RowCells::new(cells).text("roll_number") {
            if run.staged_rolls.contains(&roll_number)
                || self
                    .store
                    .find_student_by_roll_number(&roll_number)
                    .await?
                    .is_some()
            {
                run.reject(display_row, RowError::DuplicateRollNumber(roll_number));
                return Ok(());
            }
        }

        let draft = match validator.validate(cells) {
            Ok(draft) => draft,
            Err(e) => {
                run.reject(display_row, e);
                return Ok(());
            }
        };

        let certificate_id = match draft.certificate_id.clone() {
            Some(id) => {
                if run.certificate_ids.is_reserved(&id)
                    || self
                        .store
                        .find_student_by_certificate_id(&id)
                        .await?
                        .is_some()
                {
                    run.reject(display_row, RowError::DuplicateCertificateId(id));
                    return Ok(());
                }
                run.certificate_ids.reserve(&id);
                id
            }
            None => run.certificate_ids.generate(self.store, self.today).await?,
        };

        run.stage(display_row, draft.into_new_student(certificate_id));
        Ok(())
    }

    /// Save staged students as one unit. A rejected flush only costs the rows
    /// in it; an `Err` means the batch progress could not be recorded.
    async fn flush(&self, run: &mut ImportRun) -> Result<(), StoreError> {
        if run.pending.is_empty() {
            return Ok(());
        }

        let students: Vec<NewStudent> = run.pending.iter().map(|s| s.student.clone()).collect();
        match self.store.insert_students(&students).await {
            Ok(saved) => {
                log::debug!("batch {}: flushed {} students", run.batch.id, saved.len());
                run.pending.clear();
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "batch {}: flush of {} students rolled back: {}",
                    run.batch.id,
                    students.len(),
                    e
                );
                run.discard_pending(&format!("could not be saved: {}", e));
                run.sync_progress();
                self.store.save_batch(&run.batch).await
            }
        }
    }

    async fn abort(&self, mut run: ImportRun, cause: ImportError) -> ImportReport {
        let reason = format!("Import aborted: {}", cause);
        log::error!("batch {}: {}", run.batch.id, reason);

        run.discard_pending("not saved, import aborted");
        run.sync_progress();
        match run.batch.fail(&run.errors, &reason) {
            Ok(()) => {
                if let Err(e) = self.store.save_batch(&run.batch).await {
                    log::error!("batch {}: unable to record failure: {}", run.batch.id, e);
                }
            }
            Err(e) => log::error!("batch {}: {}", run.batch.id, e),
        }

        let outcome = if run.successful > 0 {
            ImportOutcome::AbortedAfterProgress
        } else {
            ImportOutcome::AbortedBeforeProgress
        };
        run.report(outcome, Some(reason))
    }
}

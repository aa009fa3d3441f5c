#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use internship_certificate_server::batch::model::BatchUpload;
use internship_certificate_server::store::{CertificateStore, MemoryStore, StoreError};
use internship_certificate_server::student::model::{
    CertificateStatus, NewStudent, StudentRecord,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use uuid::Uuid;

pub const HEADER: &str = "Student Name,Roll Number,Branch,College Name,Email,Internship Name,Internship Start Date,Internship End Date,Certificate ID";

pub fn processing_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
}

/// A valid CSV line for `roll` spanning 2024-06-01 to 2024-07-27 (56 days).
pub fn student_row(roll: &str) -> String {
    format!(
        "Student {roll},{roll},CSE,Andhra University,{lower}@example.edu,Data Engineering,2024-06-01,2024-07-27,",
        roll = roll,
        lower = roll.to_lowercase()
    )
}

pub fn student_rows(prefix: &str, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| student_row(&format!("{}{:03}", prefix, i)))
        .collect()
}

pub fn write_csv(dir: &TempDir, name: &str, header: &str, rows: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    std::fs::write(&path, content).expect("write csv fixture");
    path
}

pub async fn pending_batch(store: &dyn CertificateStore, filename: &str) -> Uuid {
    let batch = BatchUpload::new(filename, Some("tester".to_string()));
    store.create_batch(&batch).await.expect("create batch");
    batch.id
}

pub fn new_student(roll: &str, certificate_id: &str) -> NewStudent {
    NewStudent {
        student_name: format!("Student {}", roll),
        roll_number: roll.to_string(),
        branch: "CSE".to_string(),
        college_name: "Andhra University".to_string(),
        email: format!("{}@example.edu", roll.to_lowercase()),
        phone_number: None,
        internship_name: "Data Engineering".to_string(),
        internship_start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        internship_end_date: NaiveDate::from_ymd_opt(2024, 7, 27).unwrap(),
        duration_weeks: Some(8),
        mentor_name: None,
        mentor_email: None,
        internship_location: None,
        company_name: None,
        performance_rating: None,
        skills_acquired: None,
        project_title: None,
        certificate_id: certificate_id.to_string(),
        date_of_issue: processing_date(),
        remarks: None,
        certificate_status: CertificateStatus::Pending,
    }
}

/// Wraps [`MemoryStore`] with failure injection and a log of batch snapshots.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// 1-based `insert_students` calls that fail.
    failing_inserts: Mutex<Vec<usize>>,
    insert_calls: AtomicUsize,
    /// Student lookups fail once this many have succeeded.
    lookup_budget: Mutex<Option<usize>>,
    lookups: AtomicUsize,
    saved: Mutex<Vec<BatchUpload>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_insert_call(&self, call: usize) {
        self.failing_inserts.lock().push(call);
    }

    pub fn fail_lookups_after(&self, successful_lookups: usize) {
        *self.lookup_budget.lock() = Some(successful_lookups);
    }

    pub fn saved_batches(&self) -> Vec<BatchUpload> {
        self.saved.lock().clone()
    }

    fn check_lookup(&self) -> Result<(), StoreError> {
        let done = self.lookups.fetch_add(1, Ordering::SeqCst);
        match *self.lookup_budget.lock() {
            Some(budget) if done >= budget => {
                Err(StoreError::Database("connection reset by peer".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CertificateStore for FlakyStore {
    async fn find_student_by_roll_number(
        &self,
        roll_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        self.check_lookup()?;
        self.inner.find_student_by_roll_number(roll_number).await
    }

    async fn find_student_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        self.check_lookup()?;
        self.inner.find_student_by_certificate_id(certificate_id).await
    }

    async fn insert_students(
        &self,
        students: &[NewStudent],
    ) -> Result<Vec<StudentRecord>, StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_inserts.lock().contains(&call) {
            return Err(StoreError::Database("deadlock detected".to_string()));
        }
        self.inner.insert_students(students).await
    }

    async fn update_certificate_status(
        &self,
        student_id: Uuid,
        status: CertificateStatus,
    ) -> Result<(), StoreError> {
        self.inner.update_certificate_status(student_id, status).await
    }

    async fn count_students(&self) -> Result<i64, StoreError> {
        self.inner.count_students().await
    }

    async fn certificate_status_counts(
        &self,
    ) -> Result<Vec<(CertificateStatus, i64)>, StoreError> {
        self.inner.certificate_status_counts().await
    }

    async fn create_batch(&self, batch: &BatchUpload) -> Result<(), StoreError> {
        self.inner.create_batch(batch).await
    }

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchUpload>, StoreError> {
        self.inner.load_batch(batch_id).await
    }

    async fn save_batch(&self, batch: &BatchUpload) -> Result<(), StoreError> {
        self.saved.lock().push(batch.clone());
        self.inner.save_batch(batch).await
    }
}

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{CertificateStore, StoreError};
use crate::batch::model::BatchUpload;
use crate::student::model::{CertificateStatus, NewStudent, StudentRecord};

#[derive(Default)]
struct Inner {
    students: Vec<StudentRecord>,
    batches: HashMap<Uuid, BatchUpload>,
}

/// In-process store with the same uniqueness rules as the database schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(&self) -> Vec<StudentRecord> {
        self.inner.lock().students.clone()
    }

    pub fn batch(&self, batch_id: Uuid) -> Option<BatchUpload> {
        self.inner.lock().batches.get(&batch_id).cloned()
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn find_student_by_roll_number(
        &self,
        roll_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .students
            .iter()
            .find(|s| s.roll_number == roll_number)
            .cloned())
    }

    async fn find_student_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .students
            .iter()
            .find(|s| s.certificate_id == certificate_id)
            .cloned())
    }

    async fn insert_students(
        &self,
        students: &[NewStudent],
    ) -> Result<Vec<StudentRecord>, StoreError> {
        let mut inner = self.inner.lock();

        let mut rolls: HashSet<&str> = inner
            .students
            .iter()
            .map(|s| s.roll_number.as_str())
            .collect();
        let mut certificates: HashSet<&str> = inner
            .students
            .iter()
            .map(|s| s.certificate_id.as_str())
            .collect();

        for student in students {
            if !rolls.insert(student.roll_number.as_str()) {
                return Err(StoreError::Conflict(format!(
                    "roll number {}",
                    student.roll_number
                )));
            }
            if !certificates.insert(student.certificate_id.as_str()) {
                return Err(StoreError::Conflict(format!(
                    "certificate id {}",
                    student.certificate_id
                )));
            }
        }

        let now = Utc::now();
        let records: Vec<StudentRecord> = students
            .iter()
            .cloned()
            .map(|s| s.into_record(Uuid::new_v4(), now))
            .collect();
        inner.students.extend(records.iter().cloned());
        Ok(records)
    }

    async fn update_certificate_status(
        &self,
        student_id: Uuid,
        status: CertificateStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let student = inner
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
            .ok_or_else(|| StoreError::NotFound(format!("student {}", student_id)))?;
        student.certificate_status = status;
        Ok(())
    }

    async fn count_students(&self) -> Result<i64, StoreError> {
        Ok(self.inner.lock().students.len() as i64)
    }

    async fn certificate_status_counts(
        &self,
    ) -> Result<Vec<(CertificateStatus, i64)>, StoreError> {
        let inner = self.inner.lock();
        let mut counts: HashMap<CertificateStatus, i64> = HashMap::new();
        for student in &inner.students {
            *counts.entry(student.certificate_status).or_insert(0) += 1;
        }
        Ok(CertificateStatus::ALL
            .iter()
            .filter_map(|status| counts.get(status).map(|n| (*status, *n)))
            .collect())
    }

    async fn create_batch(&self, batch: &BatchUpload) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.batches.contains_key(&batch.id) {
            return Err(StoreError::Conflict(format!("batch {}", batch.id)));
        }
        inner.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchUpload>, StoreError> {
        Ok(self.inner.lock().batches.get(&batch_id).cloned())
    }

    async fn save_batch(&self, batch: &BatchUpload) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.batches.get_mut(&batch.id) {
            Some(existing) => {
                *existing = batch.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("batch {}", batch.id))),
        }
    }
}

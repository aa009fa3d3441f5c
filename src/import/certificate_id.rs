use chrono::NaiveDate;
use std::collections::HashSet;
use uuid::Uuid;

use crate::store::{CertificateStore, StoreError};

pub const CERTIFICATE_ID_PREFIX: &str = "CERT";

/// `CERT-<YYYYMMDD>-<8 uppercase hex>`.
pub fn candidate_certificate_id(date: NaiveDate) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("{}-{}-{}", CERTIFICATE_ID_PREFIX, date.format("%Y%m%d"), suffix)
}

/// Hands out certificate identifiers that collide neither with stored records
/// nor with anything reserved earlier in the same run.
#[derive(Debug, Default)]
pub struct CertificateIdGenerator {
    reserved: HashSet<String>,
}

impl CertificateIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_reserved(&self, certificate_id: &str) -> bool {
        self.reserved.contains(certificate_id)
    }

    /// Returns `false` if the identifier was already reserved.
    pub fn reserve(&mut self, certificate_id: &str) -> bool {
        self.reserved.insert(certificate_id.to_string())
    }

    pub fn release(&mut self, certificate_id: &str) {
        self.reserved.remove(certificate_id);
    }

    pub async fn generate(
        &mut self,
        store: &dyn CertificateStore,
        date: NaiveDate,
    ) -> Result<String, StoreError> {
        loop {
            let candidate = candidate_certificate_id(date);
            if self.reserved.contains(&candidate) {
                continue;
            }
            if store
                .find_student_by_certificate_id(&candidate)
                .await?
                .is_some()
            {
                log::debug!("certificate id {} already stored, regenerating", candidate);
                continue;
            }
            self.reserved.insert(candidate.clone());
            return Ok(candidate);
        }
    }
}

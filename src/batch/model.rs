use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }

    /// `pending -> in_progress -> {completed | completed_with_errors | failed}`.
    /// A pending batch may also fail directly when its file is rejected.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::InProgress) | (Self::Pending, Self::Failed) => true,
            (Self::InProgress, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown batch status: {0}")]
pub struct UnknownBatchStatus(pub String);

impl FromStr for BatchStatus {
    type Err = UnknownBatchStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "completed_with_errors" => Ok(Self::CompletedWithErrors),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownBatchStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for BatchStatus {
    type Error = UnknownBatchStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("batch status cannot move from {from} to {to}")]
pub struct BatchStatusError {
    pub from: BatchStatus,
    pub to: BatchStatus,
}

/// Progress and outcome of one spreadsheet import.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct BatchUpload {
    pub id: Uuid,
    #[schema(example = "interns-june.xlsx")]
    pub filename: String,
    pub total_records: i32,
    pub processed_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    #[sqlx(try_from = "String")]
    pub status: BatchStatus,
    pub error_details: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchUpload {
    pub fn new(filename: impl Into<String>, uploaded_by: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            total_records: 0,
            processed_records: 0,
            successful_records: 0,
            failed_records: 0,
            status: BatchStatus::Pending,
            error_details: None,
            uploaded_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: BatchStatus) -> Result<(), BatchStatusError> {
        if !self.status.can_transition_to(next) {
            return Err(BatchStatusError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start(&mut self, total_records: i32) -> Result<(), BatchStatusError> {
        self.transition(BatchStatus::InProgress)?;
        self.total_records = total_records;
        Ok(())
    }

    pub fn record_progress(&mut self, successful: i32, failed: i32) {
        self.successful_records = successful;
        self.failed_records = failed;
        self.processed_records = successful + failed;
        self.updated_at = Utc::now();
    }

    pub fn finish(&mut self, errors: &[String]) -> Result<(), BatchStatusError> {
        let next = if self.failed_records == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::CompletedWithErrors
        };
        self.transition(next)?;
        self.error_details = join_errors(errors);
        Ok(())
    }

    pub fn fail(&mut self, errors: &[String], reason: &str) -> Result<(), BatchStatusError> {
        self.transition(BatchStatus::Failed)?;
        let mut lines = errors.to_vec();
        lines.push(reason.to_string());
        self.error_details = join_errors(&lines);
        Ok(())
    }
}

fn join_errors(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

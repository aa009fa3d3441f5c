use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a generated certificate. Imports always start at `Pending`;
/// the delivery flow moves records forward from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Pending,
    Generated,
    Sent,
    Failed,
}

impl CertificateStatus {
    pub const ALL: [CertificateStatus; 4] = [
        CertificateStatus::Pending,
        CertificateStatus::Generated,
        CertificateStatus::Sent,
        CertificateStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Generated => "GENERATED",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown certificate status: {0}")]
pub struct UnknownCertificateStatus(pub String);

impl FromStr for CertificateStatus {
    type Err = UnknownCertificateStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "GENERATED" => Ok(Self::Generated),
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            _ => Err(UnknownCertificateStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for CertificateStatus {
    type Error = UnknownCertificateStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A student record as stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct StudentRecord {
    pub id: Uuid,
    #[schema(example = "Asha Rao")]
    pub student_name: String,
    #[schema(example = "21CS1042")]
    pub roll_number: String,
    pub branch: String,
    pub college_name: String,
    #[schema(example = "asha.rao@example.edu")]
    pub email: String,
    pub phone_number: Option<String>,
    pub internship_name: String,
    pub internship_start_date: NaiveDate,
    pub internship_end_date: NaiveDate,
    pub duration_weeks: Option<i32>,
    pub mentor_name: Option<String>,
    pub mentor_email: Option<String>,
    pub internship_location: Option<String>,
    pub company_name: Option<String>,
    pub performance_rating: Option<String>,
    pub skills_acquired: Option<String>,
    pub project_title: Option<String>,
    #[schema(example = "CERT-20240601-1A2B3C4D")]
    pub certificate_id: String,
    pub date_of_issue: NaiveDate,
    pub remarks: Option<String>,
    #[sqlx(try_from = "String")]
    pub certificate_status: CertificateStatus,
    pub created_at: DateTime<Utc>,
}

/// A validated student payload, ready to be handed to the persistence port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub student_name: String,
    pub roll_number: String,
    pub branch: String,
    pub college_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub internship_name: String,
    pub internship_start_date: NaiveDate,
    pub internship_end_date: NaiveDate,
    pub duration_weeks: Option<i32>,
    pub mentor_name: Option<String>,
    pub mentor_email: Option<String>,
    pub internship_location: Option<String>,
    pub company_name: Option<String>,
    pub performance_rating: Option<String>,
    pub skills_acquired: Option<String>,
    pub project_title: Option<String>,
    pub certificate_id: String,
    pub date_of_issue: NaiveDate,
    pub remarks: Option<String>,
    pub certificate_status: CertificateStatus,
}

impl NewStudent {
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> StudentRecord {
        StudentRecord {
            id,
            student_name: self.student_name,
            roll_number: self.roll_number,
            branch: self.branch,
            college_name: self.college_name,
            email: self.email,
            phone_number: self.phone_number,
            internship_name: self.internship_name,
            internship_start_date: self.internship_start_date,
            internship_end_date: self.internship_end_date,
            duration_weeks: self.duration_weeks,
            mentor_name: self.mentor_name,
            mentor_email: self.mentor_email,
            internship_location: self.internship_location,
            company_name: self.company_name,
            performance_rating: self.performance_rating,
            skills_acquired: self.skills_acquired,
            project_title: self.project_title,
            certificate_id: self.certificate_id,
            date_of_issue: self.date_of_issue,
            remarks: self.remarks,
            certificate_status: self.certificate_status,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: CertificateStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_students: i64,
    pub status_distribution: Vec<StatusCount>,
}

//! Content encoded into certificate QR codes and served by `/api/qr-data/{id}`.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::student::model::StudentRecord;

pub const PAYLOAD_TYPE: &str = "certificate_verification";
const NOT_AVAILABLE: &str = "N/A";
const DEFAULT_RATING: &str = "Excellent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationPayload {
    #[schema(example = "CERT-20240601-1A2B3C4D")]
    pub certificate_id: String,
    #[serde(default)]
    pub verification_url: String,
    #[serde(default)]
    pub view_url: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(rename = "type")]
    #[schema(example = "certificate_verification")]
    pub kind: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Number of weeks, or `"N/A"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub duration_weeks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internship_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_acquired: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Invalid QR code data format")]
    Malformed,
    #[error("Missing certificate ID")]
    MissingCertificateId,
    #[error("Invalid QR code type")]
    WrongType,
}

/// Builds payloads against one public base URL and issuer.
#[derive(Debug, Clone)]
pub struct VerificationComposer {
    base_url: String,
    issuer: String,
}

fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn or_na(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl VerificationComposer {
    pub fn new(base_url: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            issuer: issuer.into(),
        }
    }

    pub fn verification_url(&self, certificate_id: &str) -> String {
        format!("{}/qr-data/{}", self.base_url, certificate_id)
    }

    pub fn view_url(&self, certificate_id: &str) -> String {
        format!("{}/certificate/{}", self.base_url, certificate_id)
    }

    pub fn compose(&self, certificate_id: &str, student: Option<&StudentRecord>) -> VerificationPayload {
        let mut payload = VerificationPayload {
            certificate_id: certificate_id.to_string(),
            verification_url: self.verification_url(certificate_id),
            view_url: self.view_url(certificate_id),
            generated_at: Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            kind: PAYLOAD_TYPE.to_string(),
            issuer: self.issuer.clone(),
            student_name: None,
            roll_number: None,
            email: None,
            phone: None,
            college: None,
            branch: None,
            internship_name: None,
            company_name: None,
            start_date: None,
            end_date: None,
            duration_weeks: None,
            mentor_name: None,
            internship_location: None,
            performance_rating: None,
            skills_acquired: None,
            project_title: None,
            issue_date: None,
            certificate_status: None,
        };

        if let Some(s) = student {
            payload.student_name = Some(s.student_name.clone());
            payload.roll_number = Some(s.roll_number.clone());
            payload.email = Some(s.email.clone());
            payload.phone = Some(or_na(&s.phone_number));
            payload.college = Some(s.college_name.clone());
            payload.branch = Some(s.branch.clone());
            payload.internship_name = Some(s.internship_name.clone());
            payload.company_name = Some(or_na(&s.company_name));
            payload.start_date = Some(display_date(s.internship_start_date));
            payload.end_date = Some(display_date(s.internship_end_date));
            payload.duration_weeks = Some(match s.duration_weeks {
                Some(weeks) if weeks > 0 => Value::from(weeks),
                _ => Value::from(NOT_AVAILABLE),
            });
            payload.mentor_name = Some(or_na(&s.mentor_name));
            payload.internship_location = Some(or_na(&s.internship_location));
            payload.performance_rating = Some(
                s.performance_rating
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RATING.to_string()),
            );
            payload.skills_acquired = Some(or_na(&s.skills_acquired));
            payload.project_title = Some(or_na(&s.project_title));
            payload.issue_date = Some(display_date(s.date_of_issue));
            payload.certificate_status = Some(s.certificate_status.to_string());
        }

        payload
    }

    /// Pretty-printed JSON, the text that goes into the QR code.
    pub fn compose_json(
        &self,
        certificate_id: &str,
        student: Option<&StudentRecord>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.compose(certificate_id, student))
    }
}

/// Decode text scanned from a QR code.
pub fn parse_verification_payload(text: &str) -> Result<VerificationPayload, VerificationError> {
    let value: Value = serde_json::from_str(text).map_err(|_| VerificationError::Malformed)?;
    let object = value.as_object().ok_or(VerificationError::Malformed)?;

    if !object.contains_key("certificate_id") {
        return Err(VerificationError::MissingCertificateId);
    }
    if object.get("type").and_then(Value::as_str) != Some(PAYLOAD_TYPE) {
        return Err(VerificationError::WrongType);
    }

    serde_json::from_value(value).map_err(|_| VerificationError::Malformed)
}

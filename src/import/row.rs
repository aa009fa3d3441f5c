//! Turns one spreadsheet row into a validated student payload.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use super::dates::parse_date;
use super::headers::{normalize_header, REQUIRED_COLUMNS};
use super::table::CellValue;
use crate::student::model::{CertificateStatus, NewStudent};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

/// Values spreadsheet libraries emit for missing cells once stringified.
const NULL_SENTINELS: [&str; 3] = ["nan", "none", "null"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Unable to parse date in {column}: {value}")]
    InvalidDate { column: String, value: String },
    #[error("Internship start date ({start}) cannot be after end date ({end})")]
    DateRange { start: NaiveDate, end: NaiveDate },
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Invalid duration in weeks: {0}")]
    InvalidDuration(String),
    #[error("Student with roll number {0} already exists")]
    DuplicateRollNumber(String),
    #[error("Certificate ID {0} already exists")]
    DuplicateCertificateId(String),
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A validated row that still needs a certificate identifier when the sheet
/// did not supply one.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDraft {
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
    pub certificate_id: Option<String>,
    pub date_of_issue: NaiveDate,
    pub remarks: Option<String>,
}

impl StudentDraft {
    pub fn into_new_student(self, certificate_id: String) -> NewStudent {
        NewStudent {
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
            certificate_id,
            date_of_issue: self.date_of_issue,
            remarks: self.remarks,
            certificate_status: CertificateStatus::Pending,
        }
    }
}

/// Cells of one row keyed by normalized column name.
pub struct RowCells<'a> {
    cells: HashMap<String, &'a CellValue>,
}

impl<'a> RowCells<'a> {
    pub fn new(row: &[(&str, &'a CellValue)]) -> Self {
        let mut cells = HashMap::with_capacity(row.len());
        for (header, value) in row {
            cells.entry(normalize_header(header)).or_insert(*value);
        }
        Self { cells }
    }

    fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.cells.get(column).copied()
    }

    /// Trimmed text of a column, `None` when absent, blank or a null sentinel.
    pub fn text(&self, column: &str) -> Option<String> {
        let value = self.get(column)?.as_text()?;
        let trimmed = value.trim();
        if trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn required(&self, column: &str) -> Result<String, RowError> {
        self.text(column)
            .ok_or_else(|| RowError::MissingField(column.to_string()))
    }

    fn date(&self, column: &str) -> Result<NaiveDate, RowError> {
        let cell = self
            .get(column)
            .ok_or_else(|| RowError::MissingField(column.to_string()))?;
        parse_date(cell).map_err(|_| RowError::InvalidDate {
            column: column.to_string(),
            value: cell.to_string(),
        })
    }

    fn duration_weeks(&self) -> Result<Option<i32>, RowError> {
        if self.text("duration_weeks").is_none() {
            return Ok(None);
        }
        let invalid = || RowError::InvalidDuration(self.text("duration_weeks").unwrap_or_default());
        let weeks = match self.get("duration_weeks") {
            Some(CellValue::Number(n)) => *n,
            _ => self
                .text("duration_weeks")
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(invalid)?,
        };
        if !weeks.is_finite() || weeks < 0.0 || weeks.fract() != 0.0 || weeks > i32::MAX as f64 {
            return Err(invalid());
        }
        Ok(Some(weeks as i32))
    }
}

/// Validates rows against a fixed processing date.
#[derive(Debug, Clone, Copy)]
pub struct RowValidator {
    today: NaiveDate,
}

impl RowValidator {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn validate(&self, row: &[(&str, &CellValue)]) -> Result<StudentDraft, RowError> {
        let cells = RowCells::new(row);

        let mut required = HashMap::with_capacity(REQUIRED_COLUMNS.len());
        for column in REQUIRED_COLUMNS {
            required.insert(column, cells.required(column)?);
        }
        let mut take = |column: &str| required.remove(column).unwrap_or_default();

        let certificate_id = cells.text("certificate_id");

        let start = cells.date("internship_start_date")?;
        let end = cells.date("internship_end_date")?;
        if start > end {
            return Err(RowError::DateRange { start, end });
        }

        let duration_weeks = match cells.duration_weeks()? {
            Some(weeks) => Some(weeks),
            None => Some(((end - start).num_days() / 7) as i32),
        };

        let date_of_issue = match cells.text("date_of_issue") {
            Some(_) => cells.date("date_of_issue")?,
            None => self.today,
        };

        let email = take("email");
        if !is_valid_email(&email) {
            return Err(RowError::InvalidEmail(email));
        }

        Ok(StudentDraft {
            student_name: take("student_name"),
            roll_number: take("roll_number"),
            branch: take("branch"),
            college_name: take("college_name"),
            email,
            phone_number: cells.text("phone_number"),
            internship_name: take("internship_name"),
            internship_start_date: start,
            internship_end_date: end,
            duration_weeks,
            mentor_name: cells.text("mentor_name"),
            mentor_email: cells.text("mentor_email"),
            internship_location: cells.text("internship_location"),
            company_name: cells.text("company_name"),
            performance_rating: cells.text("performance_rating"),
            skills_acquired: cells.text("skills_acquired"),
            project_title: cells.text("project_title"),
            certificate_id,
            date_of_issue,
            remarks: cells.text("remarks"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn base_row() -> Vec<(String, CellValue)> {
        vec![
            ("Student Name".to_string(), text("  Asha Rao ")),
            ("Roll Number".to_string(), text("21CS1042")),
            ("Branch".to_string(), text("CSE")),
            ("College Name".to_string(), text("Andhra University")),
            ("Email".to_string(), text("asha.rao@example.edu")),
            ("Internship Name".to_string(), text("Data Engineering")),
            ("Internship Start Date".to_string(), text("2024-06-01")),
            ("Internship End Date".to_string(), text("2024-07-27")),
        ]
    }

    fn with(mut row: Vec<(String, CellValue)>, key: &str, value: CellValue) -> Vec<(String, CellValue)> {
        match row.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => row.push((key.to_string(), value)),
        }
        row
    }

    fn validate(row: &[(String, CellValue)]) -> Result<StudentDraft, RowError> {
        let borrowed: Vec<(&str, &CellValue)> = row.iter().map(|(k, v)| (k.as_str(), v)).collect();
        RowValidator::new(ymd(2024, 8, 1)).validate(&borrowed)
    }

    #[test]
    fn test_valid_row_is_normalized() {
        let draft = validate(&base_row()).unwrap();
        assert_eq!(draft.student_name, "Asha Rao");
        assert_eq!(draft.roll_number, "21CS1042");
        assert_eq!(draft.internship_start_date, ymd(2024, 6, 1));
        assert_eq!(draft.date_of_issue, ymd(2024, 8, 1));
        assert_eq!(draft.certificate_id, None);
        assert_eq!(draft.phone_number, None);
    }

    #[test]
    fn test_duration_is_derived_from_day_span() {
        // 2024-06-01 .. 2024-07-27 is 56 days
        let draft = validate(&base_row()).unwrap();
        assert_eq!(draft.duration_weeks, Some(8));

        let row = with(base_row(), "Internship End Date", text("2024-07-30"));
        assert_eq!(validate(&row).unwrap().duration_weeks, Some(8));
    }

    #[test]
    fn test_supplied_duration_is_kept() {
        let row = with(base_row(), "Duration Weeks", CellValue::Number(10.0));
        assert_eq!(validate(&row).unwrap().duration_weeks, Some(10));

        let row = with(base_row(), "duration_weeks", text("six"));
        assert!(matches!(validate(&row), Err(RowError::InvalidDuration(_))));
    }

    #[test]
    fn test_sentinel_values_count_as_missing() {
        for sentinel in ["nan", "None", "NULL", "   ", ""] {
            let row = with(base_row(), "Branch", text(sentinel));
            assert_eq!(
                validate(&row),
                Err(RowError::MissingField("branch".to_string())),
                "sentinel {sentinel:?}"
            );
        }
        let row = with(base_row(), "Branch", CellValue::Empty);
        assert_eq!(validate(&row), Err(RowError::MissingField("branch".to_string())));
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let row = with(base_row(), "Internship Start Date", text("2024-08-01"));
        assert!(matches!(validate(&row), Err(RowError::DateRange { .. })));
    }

    #[test]
    fn test_unparseable_date_is_rejected() {
        let row = with(base_row(), "Internship End Date", text("sometime in july"));
        assert_eq!(
            validate(&row),
            Err(RowError::InvalidDate {
                column: "internship_end_date".to_string(),
                value: "sometime in july".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        for bad in ["asha", "asha@example", "asha@example.c", "as ha@example.com"] {
            let row = with(base_row(), "Email", text(bad));
            assert!(
                matches!(validate(&row), Err(RowError::InvalidEmail(_))),
                "email {bad:?}"
            );
        }
    }

    #[test]
    fn test_optional_fields_are_trimmed_or_absent() {
        let row = with(base_row(), "Mentor Name", text("  Dr. Rao  "));
        let row = with(row, "Remarks", text("   "));
        let row = with(row, "Company Name", text("null"));
        let draft = validate(&row).unwrap();
        assert_eq!(draft.mentor_name.as_deref(), Some("Dr. Rao"));
        assert_eq!(draft.remarks, None);
        assert_eq!(draft.company_name, None);
    }

    #[test]
    fn test_supplied_issue_date_and_certificate_id() {
        let row = with(base_row(), "Date of Issue", text("05/08/2024"));
        let row = with(row, "Certificate ID", text(" CERT-CUSTOM-1 "));
        let draft = validate(&row).unwrap();
        assert_eq!(draft.date_of_issue, ymd(2024, 8, 5));
        assert_eq!(draft.certificate_id.as_deref(), Some("CERT-CUSTOM-1"));
    }

    #[test]
    fn test_numeric_roll_number_reads_as_integer() {
        let row = with(base_row(), "Roll Number", CellValue::Number(1042.0));
        assert_eq!(validate(&row).unwrap().roll_number, "1042");
    }

    #[test]
    fn test_new_student_starts_pending() {
        let student = validate(&base_row())
            .unwrap()
            .into_new_student("CERT-20240801-ABCDEF12".to_string());
        assert_eq!(student.certificate_status, CertificateStatus::Pending);
        assert_eq!(student.certificate_id, "CERT-20240801-ABCDEF12");
    }
}

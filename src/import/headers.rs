//! Column name normalization and the required-column check.

use std::collections::HashSet;

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "student_name",
    "roll_number",
    "branch",
    "college_name",
    "email",
    "internship_name",
    "internship_start_date",
    "internship_end_date",
];

pub const OPTIONAL_COLUMNS: [&str; 12] = [
    "phone_number",
    "duration_weeks",
    "mentor_name",
    "mentor_email",
    "internship_location",
    "company_name",
    "performance_rating",
    "skills_acquired",
    "project_title",
    "certificate_id",
    "date_of_issue",
    "remarks",
];

/// Lower-case, trim, and join internal whitespace runs with `_`.
///
/// `"  Student   Name "` becomes `"student_name"`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter().map(|h| normalize_header(h.as_ref())).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing required columns: {}", missing.join(", "))]
pub struct MissingColumns {
    pub missing: Vec<String>,
}

/// Report every required column absent from `normalized`, in canonical order.
pub fn validate_columns<S: AsRef<str>>(normalized: &[S]) -> Result<(), MissingColumns> {
    let present: HashSet<&str> = normalized.iter().map(|c| c.as_ref()).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !present.contains(**col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingColumns { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header_variants() {
        assert_eq!(normalize_header("Student Name"), "student_name");
        assert_eq!(normalize_header("  ROLL NUMBER "), "roll_number");
        assert_eq!(normalize_header("Internship\tStart  Date"), "internship_start_date");
        assert_eq!(normalize_header("email"), "email");
    }

    #[test]
    fn test_mixed_case_headers_pass_validation() {
        let raw = [
            "Student Name",
            "ROLL NUMBER",
            " Branch",
            "College Name ",
            "EMAIL",
            "Internship Name",
            "Internship Start Date",
            "internship end date",
        ];
        assert!(validate_columns(&normalize_headers(&raw)).is_ok());
    }

    #[test]
    fn test_every_missing_column_is_listed() {
        let raw = ["student_name", "roll_number", "branch"];
        let err = validate_columns(&normalize_headers(&raw)).unwrap_err();
        assert_eq!(
            err.missing,
            vec![
                "college_name",
                "email",
                "internship_name",
                "internship_start_date",
                "internship_end_date"
            ]
        );
        assert!(err.to_string().starts_with("Missing required columns: college_name, email"));
    }

    #[test]
    fn test_only_email_missing() {
        let cols: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| *c != "email")
            .collect();
        let err = validate_columns(&cols).unwrap_err();
        assert_eq!(err.missing, vec!["email".to_string()]);
    }
}

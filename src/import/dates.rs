use chrono::NaiveDate;

use super::table::CellValue;

/// Formats tried in order. Day-first layouts come before month-first ones, so
/// `03/04/2024` is the 3rd of April.
pub const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%m.%d.%Y",
    "%Y.%m.%d",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    #[error("Unable to parse date: {0}")]
    Unparseable(String),
}

pub fn parse_date_str(value: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| DateParseError::Unparseable(value.to_string()))
}

/// Date cells pass through (time of day dropped); anything else is parsed as text.
pub fn parse_date(value: &CellValue) -> Result<NaiveDate, DateParseError> {
    match value {
        CellValue::Date(d) => Ok(*d),
        CellValue::DateTime(dt) => Ok(dt.date()),
        other => match other.as_text() {
            Some(text) => parse_date_str(&text),
            None => Err(DateParseError::Unparseable(other.to_string())),
        },
    }
}

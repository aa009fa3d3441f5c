//! Spreadsheet loading.
//!
//! Reads the first sheet of a workbook (or a CSV file) into an immutable
//! [`Table`]. Cells keep whatever type the file gave them; interpreting them is
//! the row validator's job.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("unable to open spreadsheet: {0}")]
    Open(String),
    #[error("spreadsheet has no sheets")]
    NoSheet,
    #[error("spreadsheet has no header row")]
    MissingHeader,
    #[error("unable to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Textual form of the cell, `None` when the cell holds nothing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("nan"),
        }
    }
}

/// Whole numbers print without a fractional part so that numeric identifiers
/// read from a workbook (`1042.0`) come back as `1042`.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pair every cell of `index` with its header. Short rows are padded with
    /// empty cells.
    pub fn row(&self, index: usize) -> Vec<(&str, &CellValue)> {
        static EMPTY: CellValue = CellValue::Empty;
        let row = &self.rows[index];
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.as_str(), row.get(i).unwrap_or(&EMPTY)))
            .collect()
    }
}

pub fn read_table(path: &Path) -> Result<Table, TableError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path),
        other => Err(TableError::UnsupportedFormat(other.to_string())),
    }
}

fn read_csv(path: &Path) -> Result<Table, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(TableError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        rows.push(cells);
    }

    Ok(Table { headers, rows })
}

fn read_workbook(path: &Path) -> Result<Table, TableError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| TableError::Open(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TableError::NoSheet)?
        .map_err(|e| TableError::Open(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .ok_or(TableError::MissingHeader)?
        .iter()
        .map(|cell| convert_cell(cell).as_text().unwrap_or_default())
        .collect();

    let mut rows = Vec::new();
    for row in rows_iter {
        let cells: Vec<CellValue> = row.iter().map(convert_cell).collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        rows.push(cells);
    }

    Ok(Table { headers, rows })
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::DateTime)
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(CellValue::Date))
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

//! Workbook model and loaders
//!
//! The engine works on an in-memory copy of the workbook: every sheet is read
//! eagerly into a grid of [`Cell`]s, and a [`Table`] is a view of a sheet with
//! one row chosen as the header. Spreadsheets (`.xlsx`, `.xls`, `.ods`) are
//! loaded with calamine, `.csv` files with the csv crate as a single sheet.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::fs;
use std::path::Path;

/// Date-time layouts accepted in text cells, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    /// Spreadsheet error value such as `#N/A`
    Error(String),
}

impl Cell {
    /// Missing values: empty cells, blank text, NaN and spreadsheet errors
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Empty | Cell::Error(_) => true,
            Cell::Float(f) => f.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The cell's text, if it holds a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric coercion; values that cannot be read as a number yield `None`.
    /// Text may carry a trailing `%` (`"80%"` reads as 80).
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => {
                let trimmed = s.trim();
                let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
                trimmed.parse::<f64>().ok().filter(|f| !f.is_nan())
            }
            _ => None,
        }
    }

    /// Label coercion for emotion columns; null cells yield `None`.
    /// Text is trimmed, so `"happy "` and `"happy"` are the same label.
    pub fn to_label(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        match self {
            Cell::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Date-time coercion.
    ///
    /// Null cells are `Ok(None)`. Numbers are seconds since the Unix epoch.
    /// Anything that cannot be read as a date-time is an error describing the
    /// offending value.
    pub fn to_datetime(&self) -> Result<Option<NaiveDateTime>, String> {
        if self.is_null() {
            return Ok(None);
        }
        match self {
            Cell::DateTime(dt) => Ok(Some(*dt)),
            Cell::Int(i) => DateTime::from_timestamp(*i, 0)
                .map(|dt| Some(dt.naive_utc()))
                .ok_or_else(|| format!("timestamp {i} out of range")),
            Cell::Float(f) => epoch_seconds(*f)
                .map(Some)
                .ok_or_else(|| format!("timestamp {f} out of range")),
            Cell::Text(s) => parse_datetime_text(s.trim())
                .map(Some)
                .ok_or_else(|| format!("unrecognized date-time value '{}'", s.trim())),
            other => Err(format!("cannot convert '{other}' to a date-time")),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Error(e) => f.write_str(e),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Bool(b) => Cell::Bool(*b),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::String(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
                Some(value) => Cell::DateTime(value),
                None => Cell::Float(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Error(e.to_string()),
        }
    }
}

fn epoch_seconds(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let secs = value.floor();
    let nanos = ((value - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos).map(|dt| dt.naive_utc())
}

/// Convert an Excel serial date (days since 1899-12-30) to a date-time
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::try_milliseconds(millis)?)
}

fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // Bare clock times are anchored to the epoch date so they still order
    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(text, format) {
            return NaiveDate::from_ymd_opt(1970, 1, 1).map(|date| date.and_time(time));
        }
    }
    None
}

/// One sheet of a workbook as a raw grid of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Read the sheet with `header_row` as the header.
    ///
    /// Rows after the header become data rows; fully blank rows are skipped and
    /// short rows are padded with [`Cell::Empty`]. Reading an empty sheet with
    /// the default header yields an empty table.
    pub fn table(&self, header_row: usize) -> Result<Table, AnalysisError> {
        if header_row >= self.rows.len() {
            if header_row == 0 {
                return Ok(Table::default());
            }
            return Err(AnalysisError::HeaderOutOfRange {
                row: header_row,
                rows: self.rows.len(),
            });
        }

        let width = self.rows[header_row..]
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut labels = self.rows[header_row].clone();
        labels.resize(width, Cell::Empty);

        let rows = self.rows[header_row + 1..]
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_null()))
            .map(|row| {
                let mut row = row.clone();
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        Ok(Table { labels, rows })
    }
}

/// A sheet read with a specific header row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    labels: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Column labels; non-text header cells are `None`
    pub fn labels(&self) -> Vec<Option<&str>> {
        self.labels.iter().map(Cell::as_text).collect()
    }

    /// Column labels as shown in diagnostics, `Unnamed: <idx>` for blanks
    pub fn found_columns(&self) -> Vec<String> {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                if cell.is_null() {
                    format!("Unnamed: {idx}")
                } else {
                    cell.to_string()
                }
            })
            .collect()
    }

    pub fn width(&self) -> usize {
        self.labels.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An in-memory workbook: ordered sheets plus the file it came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    source: Option<String>,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self {
            source: None,
            sheets,
        }
    }

    /// Record the file name the workbook was loaded from
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    /// The default sheet: the first one in the workbook
    pub fn first_sheet(&self) -> Result<&Sheet, AnalysisError> {
        self.sheets.first().ok_or(AnalysisError::EmptyWorkbook)
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet, AnalysisError> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| AnalysisError::SheetNotFound(name.to_string()))
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|sheet| sheet.name == name)
    }
}

/// Open a workbook file after checking its extension and size
pub fn open_path(path: &Path, config: &AnalysisConfig) -> Result<Workbook, AnalysisError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !config.allows_file(&file_name) {
        return Err(AnalysisError::UnsupportedExtension(file_name));
    }

    let size = fs::metadata(path)?.len();
    if size > config.max_file_bytes {
        return Err(AnalysisError::FileTooLarge {
            size,
            limit: config.max_file_bytes,
        });
    }

    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let workbook = if is_csv {
        load_csv(path)?
    } else {
        load_spreadsheet(path)?
    };

    log::debug!(
        "Loaded {} with {} sheet(s): {:?}",
        file_name,
        workbook.sheets.len(),
        workbook.sheet_names()
    );

    Ok(workbook.with_source(file_name))
}

fn load_spreadsheet(path: &Path) -> Result<Workbook, AnalysisError> {
    let mut reader =
        open_workbook_auto(path).map_err(|e| AnalysisError::Workbook(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in reader.sheet_names().to_vec() {
        let range = reader
            .worksheet_range(&name)
            .map_err(|e| AnalysisError::Workbook(format!("sheet '{name}': {e}")))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        sheets.push(Sheet::new(name, rows));
    }

    if sheets.is_empty() {
        return Err(AnalysisError::EmptyWorkbook);
    }
    Ok(Workbook::from_sheets(sheets))
}

fn load_csv(path: &Path) -> Result<Workbook, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AnalysisError::Workbook(e.to_string()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AnalysisError::Workbook(e.to_string()))?;
        rows.push(record.iter().map(csv_field_to_cell).collect());
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());

    Ok(Workbook::from_sheets(vec![Sheet::new(name, rows)]))
}

fn csv_field_to_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Cell::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Cell::Float(f);
    }
    Cell::Text(field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_null_cells() {
        assert!(Cell::Empty.is_null());
        assert!(Cell::Float(f64::NAN).is_null());
        assert!(text("  ").is_null());
        assert!(Cell::Error("#N/A".to_string()).is_null());
        assert!(!Cell::Int(0).is_null());
        assert!(!text("none").is_null());
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(Cell::Int(70).to_number(), Some(70.0));
        assert_eq!(text(" 65.5 ").to_number(), Some(65.5));
        assert_eq!(text("80%").to_number(), Some(80.0));
        assert_eq!(Cell::Bool(true).to_number(), Some(1.0));
        assert_eq!(text("high").to_number(), None);
        assert_eq!(Cell::Empty.to_number(), None);
    }

    #[test]
    fn test_datetime_coercion() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 1, 0)
            .unwrap();
        assert_eq!(text("2024-01-15 14:01:00").to_datetime(), Ok(Some(expected)));
        assert_eq!(text("2024-01-15T14:01:00Z").to_datetime(), Ok(Some(expected)));
        assert_eq!(text("01/15/2024 14:01").to_datetime(), Ok(Some(expected)));
        assert_eq!(Cell::DateTime(expected).to_datetime(), Ok(Some(expected)));
        assert_eq!(Cell::Empty.to_datetime(), Ok(None));
        assert!(text("yesterday").to_datetime().is_err());
        assert!(Cell::Bool(true).to_datetime().is_err());
    }

    #[test]
    fn test_time_only_and_epoch_values() {
        let time = text("00:00:05").to_datetime().unwrap().unwrap();
        let epoch = Cell::Int(5).to_datetime().unwrap().unwrap();
        assert_eq!(time, epoch);
    }

    #[test]
    fn test_excel_serial_conversion() {
        let dt = excel_serial_to_datetime(45306.5).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 12:00");
    }

    #[test]
    fn test_excel_serial_out_of_range() {
        assert_eq!(excel_serial_to_datetime(-1e300), None);
        assert_eq!(excel_serial_to_datetime(1e300), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_label_coercion_trims() {
        assert_eq!(text("happy ").to_label(), Some("happy".to_string()));
        assert_eq!(text(" none ").to_label(), Some("none".to_string()));
        assert_eq!(Cell::Int(3).to_label(), Some("3".to_string()));
        assert_eq!(Cell::Empty.to_label(), None);
    }

    #[test]
    fn test_table_with_header_offset() {
        let sheet = Sheet::new(
            "Emotion Summary",
            vec![
                vec![text("Report")],
                vec![],
                vec![text("Emotion"), text("Average (%)")],
                vec![text("happy"), Cell::Float(80.0)],
                vec![Cell::Empty, Cell::Empty],
                vec![text("sad")],
            ],
        );

        let table = sheet.table(2).unwrap();
        assert_eq!(table.labels(), vec![Some("Emotion"), Some("Average (%)")]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec![text("sad"), Cell::Empty]);
    }

    #[test]
    fn test_table_out_of_range() {
        let sheet = Sheet::new("s", vec![vec![text("a")]]);
        assert!(matches!(
            sheet.table(3),
            Err(AnalysisError::HeaderOutOfRange { row: 3, rows: 1 })
        ));

        let empty = Sheet::new("s", Vec::new());
        assert!(empty.table(0).unwrap().is_empty());
    }

    #[test]
    fn test_found_columns_names_blank_headers() {
        let sheet = Sheet::new("s", vec![vec![text("Emotion"), Cell::Empty, Cell::Int(3)]]);
        let table = sheet.table(0).unwrap();
        assert_eq!(
            table.found_columns(),
            vec!["Emotion".to_string(), "Unnamed: 1".to_string(), "3".to_string()]
        );
        assert_eq!(table.labels(), vec![Some("Emotion"), None, None]);
    }

    #[test]
    fn test_workbook_lookup() {
        let workbook = Workbook::from_sheets(vec![
            Sheet::new("Raw", Vec::new()),
            Sheet::new("Emotion Summary", Vec::new()),
        ]);
        assert_eq!(workbook.first_sheet().unwrap().name(), "Raw");
        assert!(workbook.has_sheet("Emotion Summary"));
        assert!(matches!(
            workbook.sheet("Missing"),
            Err(AnalysisError::SheetNotFound(_))
        ));
        assert!(matches!(
            Workbook::default().first_sheet(),
            Err(AnalysisError::EmptyWorkbook)
        ));
    }

    #[test]
    fn test_open_path_checks_extension() {
        let config = AnalysisConfig::default();
        let result = open_path(Path::new("emotions.txt"), &config);
        assert!(matches!(result, Err(AnalysisError::UnsupportedExtension(_))));
    }

    #[test]
    fn test_open_csv() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("emotions-{}.csv", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "Session ID,Timestamp,Emotion,Confidence\n1,2024-01-15 14:00:00,happy,80\n",
        )
        .unwrap();

        let config = AnalysisConfig {
            allowed_extensions: vec!["csv".to_string()],
            ..AnalysisConfig::default()
        };
        let workbook = open_path(&path, &config).unwrap();
        fs::remove_file(&path).unwrap();

        let sheet = workbook.first_sheet().unwrap();
        assert_eq!(sheet.row_count(), 2);
        let table = sheet.table(0).unwrap();
        assert_eq!(table.rows()[0][0], Cell::Int(1));
        assert_eq!(table.rows()[0][3], Cell::Int(80));
        assert!(workbook.source().unwrap().ends_with(".csv"));
    }

    #[test]
    fn test_open_path_rejects_large_files() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("emotions-{}.csv", uuid::Uuid::new_v4()));
        fs::write(&path, "Emotion\nhappy\n").unwrap();

        let config = AnalysisConfig {
            allowed_extensions: vec!["csv".to_string()],
            max_file_bytes: 4,
            ..AnalysisConfig::default()
        };
        let result = open_path(&path, &config);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(AnalysisError::FileTooLarge { limit: 4, .. })));
    }
}

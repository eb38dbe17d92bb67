//! Error types for emotion risk analysis

use thiserror::Error;

/// Errors that can occur while loading or analyzing a workbook
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Missing required columns: {}. Found columns: {}", .missing.join(", "), .found.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Error parsing Timestamp: {0}")]
    TimestampParse(String),

    #[error(
        "Could not find header row with required columns in {sheet}: {}. Found columns: {}",
        .required.join(", "),
        .found.join(", ")
    )]
    HeaderNotFound {
        sheet: String,
        required: Vec<String>,
        found: Vec<String>,
    },

    #[error("Header row {row} is outside the sheet ({rows} rows)")]
    HeaderOutOfRange { row: usize, rows: usize },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Workbook contains no sheets")]
    EmptyWorkbook,

    #[error("Error processing file: {0}")]
    Workbook(String),

    #[error("Invalid file type: {0}. Please upload an Excel file (.xlsx or .xls)")]
    UnsupportedExtension(String),

    #[error("File is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AnalysisError {
    /// True when the input simply does not have the shape a format expects.
    ///
    /// These failures let the pipeline move on to the next input format;
    /// anything else means the workbook itself is unusable.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingColumns { .. }
                | AnalysisError::TimestampParse(_)
                | AnalysisError::HeaderNotFound { .. }
                | AnalysisError::HeaderOutOfRange { .. }
        )
    }

    /// Short machine-readable code used by the CLI and FFI error payloads
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::MissingColumns { .. } => "MISSING_COLUMNS",
            AnalysisError::TimestampParse(_) => "TIMESTAMP_PARSE",
            AnalysisError::HeaderNotFound { .. } => "HEADER_NOT_FOUND",
            AnalysisError::HeaderOutOfRange { .. } => "HEADER_OUT_OF_RANGE",
            AnalysisError::SheetNotFound(_) => "SHEET_NOT_FOUND",
            AnalysisError::EmptyWorkbook => "EMPTY_WORKBOOK",
            AnalysisError::Workbook(_) => "WORKBOOK_ERROR",
            AnalysisError::UnsupportedExtension(_) => "UNSUPPORTED_EXTENSION",
            AnalysisError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AnalysisError::Io(_) => "IO_ERROR",
            AnalysisError::Json(_) => "JSON_ERROR",
            AnalysisError::Config(_) => "CONFIG_ERROR",
        }
    }
}

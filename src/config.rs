//! Analysis configuration
//!
//! Knobs for workbook loading and format detection. Risk thresholds are fixed
//! and live in [`crate::risk`].

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default number of rows scanned when looking for a summary header
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 10;

/// Sheet holding pre-summarized data
pub const DEFAULT_SUMMARY_SHEET: &str = "Emotion Summary";

/// Largest workbook accepted by [`crate::workbook::open_path`] (16 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

/// Configuration for [`crate::pipeline::EmotionAnalyzer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rows scanned by the header locator
    pub header_scan_rows: usize,
    /// Name of the pre-summarized sheet
    pub summary_sheet: String,
    /// Compare emotion labels to the polarity sets ignoring case
    pub case_insensitive_polarity: bool,
    /// Upper bound on input file size
    pub max_file_bytes: u64,
    /// Accepted file extensions, lowercase without the dot
    pub allowed_extensions: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            summary_sheet: DEFAULT_SUMMARY_SHEET.to_string(),
            case_insensitive_polarity: true,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            allowed_extensions: vec!["xlsx".to_string(), "xls".to_string()],
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check values that would make every analysis fail
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.header_scan_rows == 0 {
            return Err(AnalysisError::Config(
                "header_scan_rows must be at least 1".to_string(),
            ));
        }
        if self.summary_sheet.trim().is_empty() {
            return Err(AnalysisError::Config(
                "summary_sheet must not be empty".to_string(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(AnalysisError::Config(
                "allowed_extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a file name carries one of the allowed extensions
    pub fn allows_file(&self, file_name: &str) -> bool {
        match file_name.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.header_scan_rows, 10);
        assert_eq!(config.summary_sheet, "Emotion Summary");
        assert!(config.case_insensitive_polarity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json(r#"{"header_scan_rows": 5}"#).unwrap();
        assert_eq!(config.header_scan_rows, 5);
        assert_eq!(config.summary_sheet, "Emotion Summary");
        assert_eq!(config.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = AnalysisConfig::from_json(r#"{"header_scan_rows": 0}"#);
        assert!(matches!(result, Err(AnalysisError::Config(_))));

        let result = AnalysisConfig::from_json("not json");
        assert!(matches!(result, Err(AnalysisError::Json(_))));
    }

    #[test]
    fn test_allows_file() {
        let config = AnalysisConfig::default();
        assert!(config.allows_file("emotions.xlsx"));
        assert!(config.allows_file("EMOTIONS.XLS"));
        assert!(!config.allows_file("emotions.csv"));
        assert!(!config.allows_file("emotions"));
    }
}

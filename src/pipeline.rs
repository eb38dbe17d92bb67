//! Pipeline orchestration
//!
//! This module provides the public API for emotion risk analysis.
//! It runs the format fallback chain over a workbook and hands the winning
//! aggregate table to risk inference.

use std::collections::BTreeMap;
use std::path::Path;

use crate::adapters::{FormatAdapter, RawEventAdapter, SummaryAdapter};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::risk::infer_risks;
use crate::types::{AggregateTable, AnalysisResult};
use crate::workbook::{open_path, Workbook};

/// Formats tried in order; the first that aggregates successfully wins
static FORMAT_CHAIN: [&(dyn FormatAdapter + Sync); 2] = [&RawEventAdapter, &SummaryAdapter];

/// Analyze a workbook with the default configuration (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let workbook = open_path(Path::new("emotions.xlsx"), &AnalysisConfig::default())?;
/// let result = analyze(&workbook)?;
/// ```
pub fn analyze(workbook: &Workbook) -> Result<AnalysisResult, AnalysisError> {
    EmotionAnalyzer::new().analyze(workbook)
}

/// Load a workbook file and analyze it with the default configuration
pub fn analyze_path(path: &Path) -> Result<AnalysisResult, AnalysisError> {
    EmotionAnalyzer::new().analyze_path(path)
}

/// Configured analyzer.
///
/// Holds no state between calls; one analyzer can serve any number of
/// workbooks, including from several threads.
#[derive(Debug, Clone, Default)]
pub struct EmotionAnalyzer {
    config: AnalysisConfig,
}

impl EmotionAnalyzer {
    /// Create an analyzer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a specific configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load and analyze a workbook file
    pub fn analyze_path(&self, path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let workbook = open_path(path, &self.config)?;
        self.analyze(&workbook)
    }

    /// Analyze a loaded workbook.
    ///
    /// Pipeline stages:
    /// 1. FormatAdapter chain - aggregate per emotion and score volatility
    /// 2. Risk inference - evaluate the rule table and rank predictions
    /// 3. Distribution - map each emotion to its proportion
    pub fn analyze(&self, workbook: &Workbook) -> Result<AnalysisResult, AnalysisError> {
        let table = self.aggregate(workbook)?;

        let risk_predictions = infer_risks(&table.aggregates, table.volatility_score);
        let emotion_distribution: BTreeMap<String, f64> = table
            .aggregates
            .iter()
            .map(|row| (row.emotion.clone(), row.proportion))
            .collect();

        Ok(AnalysisResult {
            format: table.format,
            sheet: table.sheet,
            volatility_score: table.volatility_score,
            risk_predictions,
            emotion_aggregates: table.aggregates,
            emotion_distribution,
        })
    }

    /// Run the format chain and return the first successful aggregation.
    ///
    /// A format that does not match the workbook's shape hands over to the
    /// next one; when none matches, the last mismatch is returned. Structural
    /// failures stop the chain immediately.
    pub fn aggregate(&self, workbook: &Workbook) -> Result<AggregateTable, AnalysisError> {
        let mut last_error = None;

        for adapter in FORMAT_CHAIN.iter() {
            if !adapter.applies_to(workbook, &self.config) {
                continue;
            }

            match adapter.aggregate(workbook, &self.config) {
                Ok(table) => {
                    log::info!(
                        "Read '{}' as {} ({} emotions, volatility {:.2})",
                        table.sheet,
                        table.format,
                        table.aggregates.len(),
                        table.volatility_score
                    );
                    return Ok(table);
                }
                Err(e) if e.is_format_mismatch() => {
                    log::warn!("Workbook is not {}: {}", adapter.format(), e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(AnalysisError::EmptyWorkbook))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InputFormat;
    use crate::workbook::{Cell, Sheet};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn raw_header() -> Vec<Cell> {
        vec![
            text("Session ID"),
            text("Timestamp"),
            text("Emotion"),
            text("Confidence"),
        ]
    }

    /// 100 events: 45 angry at 70% confidence, 55 neutral at 80%
    fn anger_workbook() -> Workbook {
        let mut rows = vec![raw_header()];
        for i in 0..100 {
            let (emotion, confidence) = if i < 45 { ("angry", 70.0) } else { ("neutral", 80.0) };
            rows.push(vec![
                Cell::Int(i / 10),
                text(&format!("2024-01-15 10:{:02}:{:02}", i / 60, i % 60)),
                text(emotion),
                Cell::Float(confidence),
            ]);
        }
        Workbook::from_sheets(vec![Sheet::new("Detections", rows)])
    }

    #[test]
    fn test_raw_event_scenario() {
        let result = analyze(&anger_workbook()).unwrap();

        assert_eq!(result.format, InputFormat::RawEvents);
        assert_eq!(result.sheet, "Detections");
        assert_eq!(result.volatility_score, 0.0);

        let risks: Vec<(&str, f64)> = result
            .risk_predictions
            .iter()
            .map(|p| (p.risk.as_str(), p.likelihood))
            .collect();
        assert_eq!(
            risks,
            vec![("Cardiovascular Issues", 65.0), ("Chronic Stress", 60.0)]
        );

        let angry = &result.emotion_aggregates[0];
        assert_eq!(angry.emotion, "angry");
        assert_eq!(angry.frequency, 45);
        assert!((angry.avg_confidence - 70.0).abs() < 1e-9);
        assert!((result.emotion_distribution["angry"] - 45.0).abs() < 1e-9);
        assert!((result.emotion_distribution["neutral"] - 55.0).abs() < 1e-9);
        assert_eq!(result.top_risk().map(|p| p.risk.as_str()), Some("Cardiovascular Issues"));
    }

    #[test]
    fn test_falls_back_to_summary_sheet() {
        let workbook = Workbook::from_sheets(vec![
            Sheet::new("Overview", vec![vec![text("Video"), text("Frames")]]),
            Sheet::new(
                "Emotion Summary",
                vec![
                    vec![text("Emotion Analysis")],
                    vec![text("Emotion"), text("Average (%)"), text("Max (%)"), text("Min (%)")],
                    vec![text("Sad"), Cell::Float(60.0), Cell::Float(95.0), Cell::Float(10.0)],
                    vec![text("Happy"), Cell::Float(10.0), Cell::Float(70.0), Cell::Float(5.0)],
                    vec![text("Neutral"), Cell::Float(30.0), Cell::Float(50.0), Cell::Float(20.0)],
                ],
            ),
        ]);

        let result = analyze(&workbook).unwrap();
        assert_eq!(result.format, InputFormat::PreSummarized);
        assert_eq!(result.sheet, "Emotion Summary");

        // ranges 85, 65, 30 -> mean 60 -> 6.0 on the 0-10 scale
        assert!((result.volatility_score - 6.0).abs() < 1e-9);

        let risks: Vec<&str> = result.risk_predictions.iter().map(|p| p.risk.as_str()).collect();
        assert_eq!(risks, vec!["Depression", "Anxiety", "Low Mood"]);
        assert_eq!(result.risk_predictions[0].likelihood, 80.0);
        assert_eq!(result.risk_predictions[2].likelihood, 60.0);
    }

    #[test]
    fn test_summary_error_when_both_formats_fail() {
        let workbook = Workbook::from_sheets(vec![
            Sheet::new("Overview", vec![vec![text("Video")]]),
            Sheet::new(
                "Emotion Summary",
                vec![
                    vec![text("Label"), text("Score")],
                    vec![text("happy"), Cell::Float(50.0)],
                ],
            ),
        ]);

        let err = analyze(&workbook).unwrap_err();
        assert!(matches!(err, AnalysisError::HeaderNotFound { .. }));
        let message = err.to_string();
        assert!(message.contains("Emotion, Average (%)"));
        assert!(message.contains("Found columns: Label, Score"));
    }

    #[test]
    fn test_raw_event_error_without_summary_sheet() {
        let workbook = Workbook::from_sheets(vec![Sheet::new(
            "Sheet1",
            vec![vec![text("Emotion"), text("Confidence")]],
        )]);

        let err = analyze(&workbook).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required columns: Session ID, Timestamp. Found columns: Emotion, Confidence"
        );
    }

    #[test]
    fn test_timestamp_failure_falls_back() {
        let workbook = Workbook::from_sheets(vec![
            Sheet::new(
                "Raw",
                vec![
                    raw_header(),
                    vec![Cell::Int(1), text("soon"), text("happy"), Cell::Float(50.0)],
                ],
            ),
            Sheet::new(
                "Emotion Summary",
                vec![
                    vec![text("Emotion"), text("Average (%)")],
                    vec![text("happy"), Cell::Float(50.0)],
                ],
            ),
        ]);

        let result = analyze(&workbook).unwrap();
        assert_eq!(result.format, InputFormat::PreSummarized);
    }

    #[test]
    fn test_empty_raw_event_table() {
        let workbook = Workbook::from_sheets(vec![Sheet::new(
            "Sheet1",
            vec![
                raw_header(),
                vec![Cell::Int(1), text("2024-01-15 10:00:00"), text("none"), Cell::Float(90.0)],
            ],
        )]);

        let result = analyze(&workbook).unwrap();
        assert!(result.emotion_aggregates.is_empty());
        assert!(result.emotion_distribution.is_empty());
        assert!(result.risk_predictions.is_empty());
        assert_eq!(result.volatility_score, 0.0);
    }

    #[test]
    fn test_empty_workbook() {
        assert!(matches!(
            analyze(&Workbook::default()),
            Err(AnalysisError::EmptyWorkbook)
        ));
    }

    #[test]
    fn test_volatile_sessions_flag_mood_disorders() {
        let mut rows = vec![raw_header()];
        for session in 0..2 {
            for step in 0..10 {
                let emotion = if step % 2 == 0 { "happy" } else { "sad" };
                rows.push(vec![
                    text(&format!("s{session}")),
                    text(&format!("2024-01-15 10:00:{step:02}")),
                    text(emotion),
                    Cell::Float(60.0),
                ]);
            }
        }
        let workbook = Workbook::from_sheets(vec![Sheet::new("Sheet1", rows)]);

        let result = analyze(&workbook).unwrap();
        // 9 flips per session, 18 over 20 events
        assert!((result.volatility_score - 90.0).abs() < 1e-9);
        assert_eq!(result.risk_predictions[0].risk, "Mood Disorders");
        assert_eq!(result.risk_predictions[0].likelihood, 80.0);
    }

    #[test]
    fn test_custom_summary_sheet_name() {
        let workbook = Workbook::from_sheets(vec![
            Sheet::new("Raw", Vec::new()),
            Sheet::new(
                "Summary",
                vec![
                    vec![text("Emotion"), text("Average (%)")],
                    vec![text("fear"), Cell::Float(40.0)],
                    vec![text("neutral"), Cell::Float(60.0)],
                ],
            ),
        ]);

        assert!(analyze(&workbook).is_err());

        let analyzer = EmotionAnalyzer::with_config(AnalysisConfig {
            summary_sheet: "Summary".to_string(),
            ..AnalysisConfig::default()
        });
        let result = analyzer.analyze(&workbook).unwrap();
        assert_eq!(result.risk_predictions[0].risk, "Anxiety Disorders");
        assert_eq!(result.risk_predictions[0].likelihood, 70.0);
    }
}

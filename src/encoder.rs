//! Report encoding
//!
//! Wraps an analysis result in a report envelope (producer, timestamp, source)
//! and renders it as JSON or as a plain-text report.

use std::fmt::Write as _;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::types::{AnalysisReport, AnalysisResult, InputFormat, ReportProducer, ReportSource};
use crate::{PRODUCER_NAME, VERSION};

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a result in the report envelope
    pub fn encode(&self, result: &AnalysisResult, source_file: Option<&str>) -> AnalysisReport {
        AnalysisReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            source: ReportSource {
                file: source_file.map(str::to_string),
                sheet: result.sheet.clone(),
                format: result.format,
            },
            volatility_score: result.volatility_score,
            health_predictions: result.risk_predictions.clone(),
            emotion_summary: result.emotion_aggregates.clone(),
            emotion_distribution: result.emotion_distribution.clone(),
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        result: &AnalysisResult,
        source_file: Option<&str>,
        pretty: bool,
    ) -> Result<String, AnalysisError> {
        let report = self.encode(result, source_file);
        let json = if pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(json)
    }
}

/// Render a report as human-readable text
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let file = report.source.file.as_deref().unwrap_or("<workbook>");
    let _ = writeln!(out, "Emotion risk report: {file}");
    let _ = writeln!(
        out,
        "Sheet: {} ({})",
        report.source.sheet,
        match report.source.format {
            InputFormat::RawEvents => "raw detection events",
            InputFormat::PreSummarized => "pre-summarized",
        }
    );
    let scale = match report.source.format {
        InputFormat::RawEvents => 100,
        InputFormat::PreSummarized => 10,
    };
    let _ = writeln!(
        out,
        "Volatility: {:.2} / {scale}",
        report.volatility_score
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Emotions");
    if report.emotion_summary.is_empty() {
        let _ = writeln!(out, "  (no emotions detected)");
    }
    for row in &report.emotion_summary {
        let _ = writeln!(
            out,
            "  {:<12} {:>6.1}%  freq {:<5} conf {:>5.1} ± {:.1}",
            row.emotion, row.proportion, row.frequency, row.avg_confidence, row.std_confidence
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Health risks");
    if report.health_predictions.is_empty() {
        let _ = writeln!(out, "  No elevated risks detected.");
    }
    for (rank, prediction) in report.health_predictions.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({:.1}%)",
            rank + 1,
            prediction.risk,
            prediction.likelihood
        );
        let _ = writeln!(out, "     {}", prediction.explanation);
        let _ = writeln!(out, "     Suggestions: {}", prediction.suggestions);
    }

    out
}

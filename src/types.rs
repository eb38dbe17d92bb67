//! Core types for the emotion risk pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: detection events, per-emotion aggregates, risk predictions and the
//! final analysis result.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Input layout of an emotion workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// One row per detection event (session, timestamp, emotion, confidence)
    RawEvents,
    /// One row per emotion, already summarized by an upstream tool
    PreSummarized,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::RawEvents => "raw_events",
            InputFormat::PreSummarized => "pre_summarized",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque session identifier taken from the Session ID column.
///
/// Numeric identifiers order before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::Number(n) => write!(f, "{n}"),
            SessionId::Text(s) => f.write_str(s),
        }
    }
}

/// A single emotion detection that survived row filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEvent {
    /// Session the detection belongs to (missing cells stay `None`)
    pub session_id: Option<SessionId>,
    /// Detection time (missing cells stay `None` and sort last)
    pub timestamp: Option<NaiveDateTime>,
    /// Emotion label as written in the sheet
    pub emotion: String,
    /// Classifier confidence
    pub confidence: f64,
}

/// Per-emotion statistical summary shared by both input formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAggregate {
    /// Emotion label as written in the sheet
    pub emotion: String,
    /// Number of detections (always 1 for pre-summarized rows)
    pub frequency: u32,
    /// Mean confidence
    pub avg_confidence: f64,
    /// Sample standard deviation for raw events, max-min range for summaries
    pub std_confidence: f64,
    /// Distinct sessions the emotion appeared in (raw events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_sessions: Option<u32>,
    /// Max (%) column of a summary sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_confidence: Option<f64>,
    /// Min (%) column of a summary sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// Share of total weight, in percent (0-100)
    pub proportion: f64,
}

/// Aggregation output of a format adapter, before risk inference
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    /// Format that produced the table
    pub format: InputFormat,
    /// Sheet the data was read from
    pub sheet: String,
    /// One row per emotion label
    pub aggregates: Vec<EmotionAggregate>,
    /// Format-dependent volatility (0-100 flip rate or 0-10 dispersion proxy)
    pub volatility_score: f64,
}

/// A predicted health risk with its heuristic likelihood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub risk: String,
    /// Bounded heuristic score (0-100), not a calibrated probability
    pub likelihood: f64,
    pub explanation: String,
    pub suggestions: String,
}

/// Result of analyzing one workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Format the workbook was finally read as
    pub format: InputFormat,
    /// Sheet the data was read from
    pub sheet: String,
    /// Volatility score; scale depends on `format`
    pub volatility_score: f64,
    /// Risks sorted by descending likelihood (ties keep emission order)
    #[serde(rename = "health_predictions")]
    pub risk_predictions: Vec<RiskPrediction>,
    #[serde(rename = "emotion_summary")]
    pub emotion_aggregates: Vec<EmotionAggregate>,
    /// Emotion label to proportion
    pub emotion_distribution: BTreeMap<String, f64>,
}

impl AnalysisResult {
    /// Highest-likelihood prediction, if any rule fired
    pub fn top_risk(&self) -> Option<&RiskPrediction> {
        self.risk_predictions.first()
    }
}

// ============================================================================
// Report envelope
// ============================================================================

/// Producer metadata stamped on every report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where the analyzed data came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sheet: String,
    pub format: InputFormat,
}

/// Serialized analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub source: ReportSource,
    pub volatility_score: f64,
    pub health_predictions: Vec<RiskPrediction>,
    pub emotion_summary: Vec<EmotionAggregate>,
    pub emotion_distribution: BTreeMap<String, f64>,
}

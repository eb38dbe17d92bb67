//! Emotion Risk - health risk screening from facial emotion detection exports
//!
//! Turns spreadsheets exported by emotion-recognition tools into heuristic
//! health risk predictions through a deterministic pipeline: workbook loading →
//! format detection → per-emotion aggregation → volatility scoring → rule-based
//! risk inference → report encoding.
//!
//! ## Input formats
//!
//! - **Raw events**: one detection per row (Session ID, Timestamp, Emotion, Confidence)
//! - **Pre-summarized**: an "Emotion Summary" sheet with one row per emotion
//!
//! Raw events are tried first; the summary sheet is the fallback.

pub mod adapters;
pub mod columns;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod risk;
pub mod types;
pub mod volatility;
pub mod workbook;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::AnalysisConfig;
pub use encoder::{render_text, ReportEncoder};
pub use error::AnalysisError;
pub use pipeline::{analyze, analyze_path, EmotionAnalyzer};
pub use types::{
    AnalysisReport, AnalysisResult, EmotionAggregate, InputFormat, RiskPrediction,
};
pub use workbook::{open_path, Cell, Sheet, Workbook};

/// Crate version embedded in every report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "emotion-risk";

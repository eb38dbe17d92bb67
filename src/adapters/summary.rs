//! Pre-summarized sheet adapter
//!
//! Reads the "Emotion Summary" sheet exported by upstream tools: one row per
//! emotion with average, and optionally max and min, confidence. The header
//! may sit below a title block, so it is located by scanning.

use crate::columns::{locate_header, resolve_column};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{AggregateTable, EmotionAggregate, InputFormat};
use crate::volatility::summary_volatility;
use crate::workbook::{Sheet, Workbook};

use super::{proportions, FormatAdapter};

/// Logical columns a summary sheet must have
pub const SUMMARY_COLUMNS: [&str; 2] = ["Emotion", "Average (%)"];

const MAX_COLUMN: &str = "Max (%)";
const MIN_COLUMN: &str = "Min (%)";

/// Pre-summarized sheet adapter
pub struct SummaryAdapter;

impl FormatAdapter for SummaryAdapter {
    fn format(&self) -> InputFormat {
        InputFormat::PreSummarized
    }

    fn applies_to(&self, workbook: &Workbook, config: &AnalysisConfig) -> bool {
        workbook.has_sheet(&config.summary_sheet)
    }

    fn aggregate(
        &self,
        workbook: &Workbook,
        config: &AnalysisConfig,
    ) -> Result<AggregateTable, AnalysisError> {
        let sheet = workbook.sheet(&config.summary_sheet)?;
        let aggregates = Self::aggregate_sheet(sheet, config.header_scan_rows)?;
        let volatility_score = summary_volatility(&aggregates);

        log::debug!(
            "Summary sheet '{}': {} emotions",
            sheet.name(),
            aggregates.len()
        );

        Ok(AggregateTable {
            format: InputFormat::PreSummarized,
            sheet: sheet.name().to_string(),
            aggregates,
            volatility_score,
        })
    }
}

impl SummaryAdapter {
    /// Locate the header and map each summary row to an aggregate.
    ///
    /// Every row carries unit frequency; proportions are shares of the summed
    /// average confidence. When both Max (%) and Min (%) exist their range
    /// stands in for the standard deviation.
    pub fn aggregate_sheet(
        sheet: &Sheet,
        max_rows: usize,
    ) -> Result<Vec<EmotionAggregate>, AnalysisError> {
        let header = locate_header(sheet, &SUMMARY_COLUMNS, max_rows).ok_or_else(|| {
            AnalysisError::HeaderNotFound {
                sheet: sheet.name().to_string(),
                required: SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found: sheet
                    .table(0)
                    .map(|table| table.found_columns())
                    .unwrap_or_default(),
            }
        })?;

        let (emotion_idx, average_idx) = (header.columns[0].index, header.columns[1].index);
        let max_idx = resolve_column(&header.table, MAX_COLUMN).map(|c| c.index);
        let min_idx = resolve_column(&header.table, MIN_COLUMN).map(|c| c.index);

        let mut rows = Vec::new();
        for row in header.table.rows() {
            let emotion = match row[emotion_idx].to_label() {
                Some(emotion) => emotion,
                None => continue,
            };
            let average = match row[average_idx].to_number() {
                Some(average) => average,
                None => continue,
            };
            let max = max_idx.and_then(|idx| row[idx].to_number());
            let min = min_idx.and_then(|idx| row[idx].to_number());
            rows.push((emotion, average, max, min));
        }

        let averages: Vec<f64> = rows.iter().map(|(_, average, _, _)| *average).collect();
        let shares = proportions(&averages);

        Ok(rows
            .into_iter()
            .zip(shares)
            .map(|((emotion, average, max, min), proportion)| EmotionAggregate {
                emotion,
                frequency: 1,
                avg_confidence: average,
                std_confidence: match (max, min) {
                    (Some(max), Some(min)) => max - min,
                    _ => 0.0,
                },
                unique_sessions: None,
                max_confidence: max,
                min_confidence: min,
                proportion,
            })
            .collect())
    }
}

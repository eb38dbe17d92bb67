//! Raw event log adapter
//!
//! Reads one detection per row (Session ID, Timestamp, Emotion, Confidence)
//! from the workbook's first sheet and groups detections by emotion.

use std::collections::{BTreeMap, BTreeSet};

use crate::columns::resolve_all;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{AggregateTable, EmotionAggregate, EmotionEvent, InputFormat, SessionId};
use crate::volatility::raw_event_volatility;
use crate::workbook::{Cell, Table, Workbook};

use super::{proportions, FormatAdapter};

/// Logical columns every raw event sheet must have
pub const RAW_EVENT_COLUMNS: [&str; 4] = ["Session ID", "Timestamp", "Emotion", "Confidence"];

/// Label marking frames where no face or emotion was detected
const NO_EMOTION: &str = "none";

/// Raw event log adapter
pub struct RawEventAdapter;

impl FormatAdapter for RawEventAdapter {
    fn format(&self) -> InputFormat {
        InputFormat::RawEvents
    }

    fn applies_to(&self, workbook: &Workbook, _config: &AnalysisConfig) -> bool {
        !workbook.sheets().is_empty()
    }

    fn aggregate(
        &self,
        workbook: &Workbook,
        config: &AnalysisConfig,
    ) -> Result<AggregateTable, AnalysisError> {
        let sheet = workbook.first_sheet()?;
        let table = sheet.table(0)?;

        let events = Self::extract_events(&table)?;
        let aggregates = Self::aggregate_events(&events);
        let volatility_score = raw_event_volatility(&events, config.case_insensitive_polarity);

        log::debug!(
            "Raw events in '{}': {} rows, {} kept, {} emotions",
            sheet.name(),
            table.len(),
            events.len(),
            aggregates.len()
        );

        Ok(AggregateTable {
            format: InputFormat::RawEvents,
            sheet: sheet.name().to_string(),
            aggregates,
            volatility_score,
        })
    }
}

impl RawEventAdapter {
    /// Validate the header and turn rows into detection events.
    ///
    /// The whole Timestamp column must parse before any row is filtered.
    /// Rows with a missing emotion, the `none` label, or a confidence that is
    /// not numeric are dropped.
    pub fn extract_events(table: &Table) -> Result<Vec<EmotionEvent>, AnalysisError> {
        let columns = resolve_all(table, &RAW_EVENT_COLUMNS).map_err(|missing| {
            AnalysisError::MissingColumns {
                missing,
                found: table.found_columns(),
            }
        })?;
        let (session_idx, timestamp_idx, emotion_idx, confidence_idx) = (
            columns[0].index,
            columns[1].index,
            columns[2].index,
            columns[3].index,
        );

        let timestamps = table
            .rows()
            .iter()
            .enumerate()
            .map(|(position, row)| {
                row[timestamp_idx]
                    .to_datetime()
                    .map_err(|e| AnalysisError::TimestampParse(format!("{e}, at position {position}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = Vec::with_capacity(table.len());
        for (row, timestamp) in table.rows().iter().zip(timestamps) {
            let emotion = match row[emotion_idx].to_label() {
                Some(emotion) if emotion != NO_EMOTION => emotion,
                _ => continue,
            };
            let confidence = match row[confidence_idx].to_number() {
                Some(confidence) => confidence,
                None => continue,
            };

            events.push(EmotionEvent {
                session_id: session_id(&row[session_idx]),
                timestamp,
                emotion,
                confidence,
            });
        }

        Ok(events)
    }

    /// Group events by emotion label.
    ///
    /// Rows come out in label order. Standard deviation is the sample
    /// deviation, 0 for single-detection groups.
    pub fn aggregate_events(events: &[EmotionEvent]) -> Vec<EmotionAggregate> {
        let mut groups: BTreeMap<&str, EmotionGroup> = BTreeMap::new();
        for event in events {
            let group = groups.entry(event.emotion.as_str()).or_default();
            group.confidences.push(event.confidence);
            if let Some(session) = &event.session_id {
                group.sessions.insert(session);
            }
        }

        let frequencies: Vec<f64> = groups
            .values()
            .map(|group| group.confidences.len() as f64)
            .collect();
        let shares = proportions(&frequencies);

        groups
            .into_iter()
            .zip(shares)
            .map(|((emotion, group), proportion)| EmotionAggregate {
                emotion: emotion.to_string(),
                frequency: group.confidences.len() as u32,
                avg_confidence: mean(&group.confidences),
                std_confidence: sample_std_dev(&group.confidences),
                unique_sessions: Some(group.sessions.len() as u32),
                max_confidence: None,
                min_confidence: None,
                proportion,
            })
            .collect()
    }
}

#[derive(Default)]
struct EmotionGroup<'a> {
    confidences: Vec<f64>,
    sessions: BTreeSet<&'a SessionId>,
}

fn session_id(cell: &Cell) -> Option<SessionId> {
    if cell.is_null() {
        return None;
    }
    match cell {
        Cell::Int(i) => Some(SessionId::Number(*i)),
        Cell::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Some(SessionId::Number(*f as i64))
        }
        Cell::Text(s) => Some(SessionId::Text(s.trim().to_string())),
        other => Some(SessionId::Text(other.to_string())),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|x| (x - avg).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

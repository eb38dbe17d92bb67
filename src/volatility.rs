//! Volatility scoring
//!
//! Raw event logs are scored by how often consecutive detections within a
//! session flip between positive and negative emotions (0-100). Summary sheets
//! have no sequence, so their score is a dispersion proxy derived from the
//! per-emotion confidence range (0-10). The two scales are not comparable.

use crate::types::{EmotionAggregate, EmotionEvent};

/// Emotions counted as positive polarity
pub const POSITIVE_EMOTIONS: &[&str] = &["happy", "surprise"];

/// Emotions counted as negative polarity
pub const NEGATIVE_EMOTIONS: &[&str] = &["sad", "angry", "fear"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Positive,
    Negative,
}

fn polarity(emotion: &str, case_insensitive: bool) -> Option<Polarity> {
    let matches = |set: &[&str]| {
        set.iter().any(|candidate| {
            if case_insensitive {
                candidate.eq_ignore_ascii_case(emotion)
            } else {
                *candidate == emotion
            }
        })
    };

    if matches(POSITIVE_EMOTIONS) {
        Some(Polarity::Positive)
    } else if matches(NEGATIVE_EMOTIONS) {
        Some(Polarity::Negative)
    } else {
        None
    }
}

/// Count positive/negative flips between consecutive events of the same
/// session, after ordering by (session, timestamp).
///
/// Events without a session never take part in a flip. Missing timestamps
/// sort last within their session.
pub fn count_polarity_flips(events: &[EmotionEvent], case_insensitive: bool) -> usize {
    let mut ordered: Vec<&EmotionEvent> = events
        .iter()
        .filter(|event| event.session_id.is_some())
        .collect();
    ordered.sort_by(|a, b| {
        a.session_id
            .cmp(&b.session_id)
            .then_with(|| a.timestamp.is_none().cmp(&b.timestamp.is_none()))
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    ordered
        .windows(2)
        .filter(|pair| pair[0].session_id == pair[1].session_id)
        .filter(|pair| {
            matches!(
                (
                    polarity(&pair[0].emotion, case_insensitive),
                    polarity(&pair[1].emotion, case_insensitive),
                ),
                (Some(Polarity::Positive), Some(Polarity::Negative))
                    | (Some(Polarity::Negative), Some(Polarity::Positive))
            )
        })
        .count()
}

/// Flip rate per 100 events for a raw event log (0 when there are no events)
pub fn raw_event_volatility(events: &[EmotionEvent], case_insensitive: bool) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let flips = count_polarity_flips(events, case_insensitive);
    flips as f64 / events.len() as f64 * 100.0
}

/// Mean confidence range scaled to 0-10 for a summary sheet.
///
/// Only rows carrying both a max and a min take part; 0 when no row does.
pub fn summary_volatility(aggregates: &[EmotionAggregate]) -> f64 {
    let ranges: Vec<f64> = aggregates
        .iter()
        .filter(|a| a.max_confidence.is_some() && a.min_confidence.is_some())
        .map(|a| a.std_confidence)
        .collect();
    if ranges.is_empty() {
        return 0.0;
    }
    let mean_range = ranges.iter().sum::<f64>() / ranges.len() as f64;
    mean_range / 100.0 * 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(second: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(10, 0, second))
    }

    fn event(session: i64, second: u32, emotion: &str) -> EmotionEvent {
        EmotionEvent {
            session_id: Some(SessionId::Number(session)),
            timestamp: at(second),
            emotion: emotion.to_string(),
            confidence: 50.0,
        }
    }

    #[test]
    fn test_alternating_sessions() {
        let mut events = Vec::new();
        for session in [1, 2] {
            for (second, emotion) in ["happy", "sad", "happy", "sad"].iter().enumerate() {
                events.push(event(session, second as u32, emotion));
            }
        }

        // (4 - 1) flips per session, 2 sessions, 8 events
        assert_eq!(count_polarity_flips(&events, true), 6);
        assert!((raw_event_volatility(&events, true) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_orders_by_timestamp_within_session() {
        let events = vec![
            event(1, 2, "happy"),
            event(1, 0, "happy"),
            event(1, 1, "happy"),
            event(1, 3, "angry"),
        ];
        assert_eq!(count_polarity_flips(&events, true), 1);

        let shuffled = vec![
            event(1, 0, "happy"),
            event(1, 2, "happy"),
            event(1, 1, "fear"),
        ];
        // chronological: happy, fear, happy
        assert_eq!(count_polarity_flips(&shuffled, true), 2);
    }

    #[test]
    fn test_no_flips_across_sessions() {
        let events = vec![event(1, 0, "happy"), event(2, 1, "sad"), event(3, 2, "happy")];
        assert_eq!(count_polarity_flips(&events, true), 0);
    }

    #[test]
    fn test_neutral_interrupts_flip() {
        let events = vec![
            event(1, 0, "happy"),
            event(1, 1, "neutral"),
            event(1, 2, "sad"),
            event(1, 3, "surprise"),
        ];
        assert_eq!(count_polarity_flips(&events, true), 1);
        assert!((raw_event_volatility(&events, true) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_sensitivity_switch() {
        let events = vec![event(1, 0, "Happy"), event(1, 1, "SAD")];
        assert_eq!(count_polarity_flips(&events, true), 1);
        assert_eq!(count_polarity_flips(&events, false), 0);
    }

    #[test]
    fn test_events_without_session_are_skipped() {
        let mut orphan = event(1, 1, "sad");
        orphan.session_id = None;
        let events = vec![event(1, 0, "happy"), orphan, event(1, 2, "happy")];
        assert_eq!(count_polarity_flips(&events, true), 0);
        assert_eq!(raw_event_volatility(&[], true), 0.0);
    }

    fn summary_row(max: Option<f64>, min: Option<f64>) -> EmotionAggregate {
        EmotionAggregate {
            emotion: "happy".to_string(),
            frequency: 1,
            avg_confidence: 50.0,
            std_confidence: match (max, min) {
                (Some(max), Some(min)) => max - min,
                _ => 0.0,
            },
            unique_sessions: None,
            max_confidence: max,
            min_confidence: min,
            proportion: 50.0,
        }
    }

    #[test]
    fn test_summary_volatility() {
        let rows = [
            summary_row(Some(80.0), Some(50.0)),
            summary_row(Some(20.0), Some(10.0)),
        ];
        assert!((summary_volatility(&rows) - 2.0).abs() < 1e-9);
        assert_eq!(summary_volatility(&[]), 0.0);
    }

    #[test]
    fn test_summary_volatility_skips_partial_ranges() {
        let rows = [
            summary_row(Some(90.0), Some(30.0)),
            summary_row(None, Some(10.0)),
            summary_row(Some(70.0), None),
        ];
        assert!((summary_volatility(&rows) - 6.0).abs() < 1e-9);

        let no_ranges = [summary_row(None, None), summary_row(Some(70.0), None)];
        assert_eq!(summary_volatility(&no_ranges), 0.0);
    }
}

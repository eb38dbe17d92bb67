//! Input format adapters
//!
//! Each adapter knows one workbook layout, validates it, and reduces it to the
//! shared per-emotion [`AggregateTable`]. Everything downstream of an adapter
//! is format-agnostic.

mod raw_events;
mod summary;

pub use raw_events::{RawEventAdapter, RAW_EVENT_COLUMNS};
pub use summary::{SummaryAdapter, SUMMARY_COLUMNS};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{AggregateTable, InputFormat};
use crate::workbook::Workbook;

/// Trait for workbook format adapters
pub trait FormatAdapter {
    /// Layout this adapter reads
    fn format(&self) -> InputFormat;

    /// Whether the workbook has the sheet this adapter reads from
    fn applies_to(&self, workbook: &Workbook, config: &AnalysisConfig) -> bool;

    /// Validate the layout and aggregate it into per-emotion rows
    fn aggregate(
        &self,
        workbook: &Workbook,
        config: &AnalysisConfig,
    ) -> Result<AggregateTable, AnalysisError>;
}

/// Turn weights into percentages of their total (all zero when the total is 0)
pub(crate) fn proportions(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter().map(|w| w / total * 100.0).collect()
    } else {
        vec![0.0; weights.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportions_sum_to_100() {
        let shares = proportions(&[45.0, 55.0, 3.0]);
        let total: f64 = shares.iter().sum();
        assert!((total - 100.0).abs() < 1e-6);
        assert!((shares[0] - 45.0 / 103.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_proportions_zero_total() {
        assert_eq!(proportions(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert!(proportions(&[]).is_empty());
    }
}

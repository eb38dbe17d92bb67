//! Column resolution
//!
//! Spreadsheets from third-party tools rarely agree on header spelling, so
//! logical column names are matched against actual labels after a light
//! normalization: lowercase, spaces removed, and the literal tokens `(%` and
//! `)` removed. Nothing else is normalized.

use crate::workbook::{Sheet, Table};

/// Normalize a header label for comparison
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace(' ', "")
        .replace("(%", "")
        .replace(')', "")
}

/// Index of the first label matching `target` after normalization.
///
/// `None` entries (non-text headers) and empty labels never match.
pub fn resolve_index<'a, I>(labels: I, target: &str) -> Option<usize>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let target = normalize_label(target);
    labels.into_iter().position(|label| match label {
        Some(label) if !label.is_empty() => normalize_label(label) == target,
        _ => false,
    })
}

/// First label matching `target` after normalization
pub fn resolve<'a>(labels: &[Option<&'a str>], target: &str) -> Option<&'a str> {
    resolve_index(labels.iter().copied(), target).and_then(|idx| labels[idx])
}

/// A logical column bound to a concrete header label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub logical: String,
    pub label: String,
    pub index: usize,
}

/// Resolve one logical column against a table's header
pub fn resolve_column(table: &Table, logical: &str) -> Option<ResolvedColumn> {
    let labels = table.labels();
    let index = resolve_index(labels.iter().copied(), logical)?;
    Some(ResolvedColumn {
        logical: logical.to_string(),
        label: labels[index]?.to_string(),
        index,
    })
}

/// Resolve every logical column, or report the ones that are missing
pub fn resolve_all(
    table: &Table,
    required: &[&str],
) -> Result<Vec<ResolvedColumn>, Vec<String>> {
    let mut resolved = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for logical in required {
        match resolve_column(table, logical) {
            Some(column) => resolved.push(column),
            None => missing.push(logical.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(resolved)
    } else {
        Err(missing)
    }
}

/// Header row found by [`locate_header`]
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMatch {
    /// Zero-based row used as header
    pub row: usize,
    /// Required columns, in the order they were requested
    pub columns: Vec<ResolvedColumn>,
    /// The sheet re-read with `row` as header
    pub table: Table,
}

impl HeaderMatch {
    /// Index of a resolved logical column
    pub fn index_of(&self, logical: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|column| column.logical == logical)
            .map(|column| column.index)
    }
}

/// Find the first row within `max_rows` that works as a header for every
/// required column.
///
/// Candidate rows that cannot be read are skipped. The first match by
/// increasing row index wins.
pub fn locate_header(sheet: &Sheet, required: &[&str], max_rows: usize) -> Option<HeaderMatch> {
    for row in 0..max_rows {
        let table = match sheet.table(row) {
            Ok(table) => table,
            Err(e) => {
                log::debug!("Skipping header candidate {} in '{}': {}", row, sheet.name(), e);
                continue;
            }
        };

        if let Ok(columns) = resolve_all(&table, required) {
            log::debug!("Header for '{}' found at row {}", sheet.name(), row);
            return Some(HeaderMatch {
                row,
                columns,
                table,
            });
        }
    }
    None
}

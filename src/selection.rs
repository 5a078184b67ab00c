//! Selection geometry.
//!
//! A selection is an ordered list of rectangular [`Region`]s produced by the
//! grid widget. The functions here turn a selection into the inputs of a
//! calculation: the numeric values it covers, the data columns it touches,
//! whether it is a whole-column selection, and the time span it covers.
//!
//! All functions are total. Regions with a missing axis, indices outside
//! the schema and empty selections degrade to empty results.

use crate::schema::Schema;
use crate::store::SparseCellStore;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle over rows and columns, inclusive on both ends.
///
/// `rows: None` means the region spans every row (a column header click).
/// `cols: None` means the region spans every column (a row header click).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<(usize, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<(usize, usize)>,
}

impl Region {
    /// A bounded rectangle.
    pub fn cells(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        Region {
            rows: Some((start_row, end_row)),
            cols: Some((start_col, end_col)),
        }
    }

    /// A single cell.
    pub fn cell(row: usize, col: usize) -> Self {
        Self::cells(row, row, col, col)
    }

    /// Every row of a single column.
    pub fn column(col: usize) -> Self {
        Self::columns(col, col)
    }

    /// Every row of a column span.
    pub fn columns(start_col: usize, end_col: usize) -> Self {
        Region {
            rows: None,
            cols: Some((start_col, end_col)),
        }
    }

    /// Every column of a row span.
    pub fn rows(start_row: usize, end_row: usize) -> Self {
        Region {
            rows: Some((start_row, end_row)),
            cols: None,
        }
    }
}

/// First and last time-axis values covered by a selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        TimeRange {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }
}

/// Column span used when a region carries rows but no column bound.
const DEFAULT_COLUMNS: (usize, usize) = (1, 1);

/// Parse the leading numeric prefix of `text` as a float.
///
/// Leading whitespace is skipped and trailing garbage is ignored, so
/// `"12.5 mg"` yields `12.5`. Returns `None` when no digits lead the text.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        let inf = f64::INFINITY;
        return Some(if bytes[0] == b'-' { -inf } else { inf });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Numeric value of a stored cell, `None` for missing or non-numeric cells.
#[inline]
pub fn cell_number(store: &SparseCellStore, row: usize, col: usize) -> Option<f64> {
    store.get(row, col).and_then(parse_numeric)
}

/// Data columns touched by any region, in first-seen order.
///
/// Column 0 (time) and indices outside `[1, column_count)` are skipped.
pub fn columns_touched(selection: &[Region], column_count: usize) -> Vec<usize> {
    let mut touched = Vec::new();
    let Some(last) = column_count.checked_sub(1) else {
        return touched;
    };
    for (start, end) in selection.iter().filter_map(|r| r.cols) {
        for col in start.max(1)..=end.min(last) {
            if !touched.contains(&col) {
                touched.push(col);
            }
        }
    }
    touched
}

/// Names of the data columns touched by the selection, in first-seen order.
pub fn column_names_touched(selection: &[Region], schema: &Schema) -> Vec<String> {
    columns_touched(selection, schema.len())
        .into_iter()
        .filter_map(|idx| schema.get_column(idx).map(|c| c.name.clone()))
        .collect()
}

/// True iff the selection is exactly one single-column region covering
/// every row (either row-unbounded or bounded to `[0, total_rows - 1]`).
pub fn is_whole_column(selection: &[Region], total_rows: usize) -> bool {
    let [region] = selection else {
        return false;
    };
    match region.cols {
        Some((start, end)) if start == end => {}
        _ => return false,
    }
    match region.rows {
        None => true,
        Some((start, end)) => total_rows > 0 && start == 0 && end == total_rows - 1,
    }
}

/// Every parseable number inside the selection's rectangles.
///
/// Regions without a row bound contribute nothing; regions without a
/// column bound read column 1. Non-numeric and missing cells are skipped.
pub fn values_in_selection(selection: &[Region], store: &SparseCellStore) -> Vec<f64> {
    let mut values = Vec::new();
    for region in selection {
        let Some((start_row, end_row)) = region.rows else {
            continue;
        };
        let (start_col, end_col) = region.cols.unwrap_or(DEFAULT_COLUMNS);
        for row in start_row..=end_row {
            for col in start_col..=end_col {
                if let Some(num) = cell_number(store, row, col) {
                    values.push(num);
                }
            }
        }
    }
    values
}

/// Every parseable number in one column across all regions' row ranges.
pub fn values_in_column(selection: &[Region], store: &SparseCellStore, col: usize) -> Vec<f64> {
    let mut values = Vec::new();
    for (start_row, end_row) in selection.iter().filter_map(|r| r.rows) {
        for row in start_row..=end_row {
            if let Some(num) = cell_number(store, row, col) {
                values.push(num);
            }
        }
    }
    values
}

/// Every parseable number in rows `[0, total_rows)` of one column.
pub fn values_in_whole_column(store: &SparseCellStore, col: usize, total_rows: usize) -> Vec<f64> {
    (0..total_rows)
        .filter_map(|row| cell_number(store, row, col))
        .collect()
}

/// Name of the column a calculation is reported against.
///
/// Only the first region is considered. A span starting at the time
/// column resolves to the first data column; an out-of-range index falls
/// back to column 1. Empty when there is nothing to name.
pub fn primary_column_name(selection: &[Region], schema: &Schema) -> String {
    let Some((start, end)) = selection.first().and_then(|r| r.cols) else {
        return String::new();
    };

    let mut index = if start == 0 && end > 0 { 1 } else { start };
    if index >= schema.len() {
        index = 1;
    }

    schema
        .get_column(index)
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

/// Time-axis values at the lowest start row and the highest end row of
/// all row-bounded regions.
pub fn time_range(selection: &[Region], store: &SparseCellStore) -> TimeRange {
    let bounds = selection
        .iter()
        .filter_map(|r| r.rows)
        .fold(None, |acc: Option<(usize, usize)>, (start, end)| match acc {
            None => Some((start, end)),
            Some((min, max)) => Some((min.min(start), max.max(end))),
        });

    match bounds {
        None => TimeRange::default(),
        Some((min_row, max_row)) => TimeRange::new(time_at(store, min_row), time_at(store, max_row)),
    }
}

/// Time-axis values of the first and last row of the sheet.
pub fn whole_column_time_range(store: &SparseCellStore, total_rows: usize) -> TimeRange {
    match total_rows.checked_sub(1) {
        None => TimeRange::default(),
        Some(last) => TimeRange::new(time_at(store, 0), time_at(store, last)),
    }
}

fn time_at(store: &SparseCellStore, row: usize) -> &str {
    store.get(row, 0).unwrap_or("")
}

/// End row of the last region, used to anchor floating controls.
pub fn last_selected_row(selection: &[Region]) -> Option<usize> {
    selection.last().and_then(|r| r.rows).map(|(_, end)| end)
}

/// Highest column index covered by any region, 0 if none.
pub fn rightmost_column(selection: &[Region]) -> usize {
    selection
        .iter()
        .filter_map(|r| r.cols)
        .map(|(start, end)| start.max(end))
        .max()
        .unwrap_or(0)
}

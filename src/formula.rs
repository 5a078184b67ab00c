//! Derived-column formulas.
//!
//! A formula is authored as a token list such as `["Mass", "÷", "Volume"]`.
//! Only the three-token form `[column, operator, column]` is evaluated;
//! anything else is inert. Applying a formula appends a new data column
//! whose cells hold the row-by-row result as fixed-point text:
//! - `Density × Volume`
//! - `Mass ÷ Volume` (a zero denominator yields `0.00`)
//! - `Start - End`

use crate::config::SessionConfig;
use crate::schema::{ColumnDef, ColumnKind};
use crate::selection::cell_number;
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Binary operators available between two columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaOp {
    Add,      // +
    Subtract, // -
    Multiply, // ×
    Divide,   // ÷
}

impl FormulaOp {
    pub const ALL: [FormulaOp; 4] = [
        FormulaOp::Add,
        FormulaOp::Subtract,
        FormulaOp::Multiply,
        FormulaOp::Divide,
    ];

    /// Operator for a token, or `None` if the token is not an operator.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(FormulaOp::Add),
            "-" => Some(FormulaOp::Subtract),
            "×" => Some(FormulaOp::Multiply),
            "÷" => Some(FormulaOp::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            FormulaOp::Add => "+",
            FormulaOp::Subtract => "-",
            FormulaOp::Multiply => "×",
            FormulaOp::Divide => "÷",
        }
    }

    /// Apply the operator. Division by zero yields 0.
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            FormulaOp::Add => left + right,
            FormulaOp::Subtract => left - right,
            FormulaOp::Multiply => left * right,
            FormulaOp::Divide => {
                if right == 0.0 {
                    0.0
                } else {
                    left / right
                }
            }
        }
    }
}

impl std::fmt::Display for FormulaOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed `[column, operator, column]` formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFormula {
    pub left: String,
    pub op: FormulaOp,
    pub right: String,
}

impl ColumnFormula {
    pub fn new(left: impl Into<String>, op: FormulaOp, right: impl Into<String>) -> Self {
        ColumnFormula {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    /// Parse a token list. Returns `None` unless it is exactly
    /// `[column, operator, column]`.
    pub fn from_elements(elements: &[String]) -> Option<Self> {
        let [left, op, right] = elements else {
            return None;
        };
        let op = FormulaOp::from_symbol(op)?;
        Some(ColumnFormula::new(left.as_str(), op, right.as_str()))
    }

    pub fn elements(&self) -> Vec<String> {
        vec![self.left.clone(), self.op.symbol().to_string(), self.right.clone()]
    }
}

impl std::fmt::Display for ColumnFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// Format a number with exactly `places` fractional digits.
///
/// Exact halfway cases round away from zero (`0.125` becomes `"0.13"`),
/// and a zero result is never rendered with a minus sign.
pub fn format_fixed(value: f64, places: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if !value.is_finite() {
        return format!("{}", value);
    }

    const GUARD: usize = 30;
    let extended = format!("{:.*}", places + GUARD, value);
    let (head, tail) = extended.split_at(extended.len() - GUARD);

    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    if !is_tie {
        return format!("{:.*}", places, value);
    }

    let head = head.strip_suffix('.').unwrap_or(head);
    increment_last_digit(head)
}

/// Add one unit in the last place to a decimal string, carrying as needed.
fn increment_last_digit(number: &str) -> String {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };

    let mut bytes = digits.as_bytes().to_vec();
    let mut carry = true;
    for b in bytes.iter_mut().rev() {
        if !carry {
            break;
        }
        match *b {
            b'.' => continue,
            b'9' => *b = b'0',
            _ => {
                *b += 1;
                carry = false;
            }
        }
    }

    let mut result = String::with_capacity(bytes.len() + 2);
    result.push_str(sign);
    if carry {
        result.push('1');
    }
    result.push_str(&String::from_utf8_lossy(&bytes));
    result
}

/// Evaluate `formula` over every row and append the result as a new data
/// column named `column_name`.
///
/// Unparsable or missing operand cells count as 0. Returns the new column
/// index, or `None` (leaving the sheet untouched) when either operand
/// column does not exist.
pub fn apply_column_formula(
    sheet: &mut Sheet,
    formula: &ColumnFormula,
    column_name: &str,
    config: &SessionConfig,
) -> Option<usize> {
    let left = sheet.schema().get_column_index(&formula.left);
    let right = sheet.schema().get_column_index(&formula.right);
    let (Some(left), Some(right)) = (left, right) else {
        log::debug!("Formula '{}' references an unknown column; nothing applied", formula);
        return None;
    };

    let values: Vec<String> = (0..sheet.row_count())
        .map(|row| {
            let a = cell_number(sheet.store(), row, left).unwrap_or(0.0);
            let b = cell_number(sheet.store(), row, right).unwrap_or(0.0);
            let result = formula.op.apply(a, b);
            let result = if result.is_finite() { result } else { 0.0 };
            format_fixed(result, config.decimal_places)
        })
        .collect();

    let name = if column_name.trim().is_empty() {
        config.default_column_name.as_str()
    } else {
        column_name
    };
    let name = sheet.unique_column_name(name);
    let id = sheet.allocate_column_id(&config.derived_id_prefix);
    let rows = values.len();
    let index = sheet.append_column(ColumnDef::new(name, ColumnKind::Data, id.as_str()), values);

    log::info!(
        "Derived column {} ({}) = {} materialized over {} rows",
        index,
        id,
        formula,
        rows
    );
    Some(index)
}

/// The formula being authored: an ordered token list plus the name the
/// new column will get.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FormulaDraft {
    elements: Vec<String>,
    column_name: String,
}

impl FormulaDraft {
    pub fn new(column_name: impl Into<String>) -> Self {
        FormulaDraft {
            elements: Vec::new(),
            column_name: column_name.into(),
        }
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn set_column_name(&mut self, name: impl Into<String>) {
        self.column_name = name.into();
    }

    pub fn push(&mut self, element: impl Into<String>) {
        self.elements.push(element.into());
    }

    /// Remove the token at `index`; out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.elements.len() {
            Some(self.elements.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Replace the tokens with a copy of `elements`.
    pub fn load(&mut self, elements: &[String]) {
        self.elements = elements.to_vec();
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Tokens joined by single spaces, for preview.
    pub fn formula_string(&self) -> String {
        self.elements.join(" ")
    }

    pub fn parse(&self) -> Option<ColumnFormula> {
        ColumnFormula::from_elements(&self.elements)
    }
}

/// Most-recently-used list of applied formulas.
///
/// Entries are compared by their full token sequence; re-applying a
/// remembered formula moves it to the front instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentFormulas {
    entries: VecDeque<Vec<String>>,
    capacity: usize,
}

impl RecentFormulas {
    pub fn new(capacity: usize) -> Self {
        RecentFormulas {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a formula as most recent. Lists shorter than three tokens
    /// are not remembered.
    pub fn remember(&mut self, elements: &[String]) {
        if elements.len() < 3 || self.capacity == 0 {
            return;
        }
        self.entries.retain(|entry| entry.as_slice() != elements);
        self.entries.push_front(elements.to_vec());
        self.entries.truncate(self.capacity);
    }

    pub fn get(&self, index: usize) -> Option<&[String]> {
        self.entries.get(index).map(Vec::as_slice)
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.entries.iter().map(Vec::as_slice)
    }

    pub fn to_vec(&self) -> Vec<Vec<String>> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecentFormulas {
    fn default() -> Self {
        RecentFormulas::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn make_sheet() -> Sheet {
        let mut sheet = Sheet::new(Schema::time_series());
        let rows = [("t0", "2", "4"), ("t1", "3.5", "0"), ("t2", "n/a", "1.25"), ("t3", "10", "")];
        for (row, (t, a, b)) in rows.iter().enumerate() {
            sheet.set_cell(row, 0, *t).unwrap();
            sheet.set_cell(row, 1, *a).unwrap();
            if !b.is_empty() {
                sheet.set_cell(row, 2, *b).unwrap();
            }
        }
        sheet.clear_changeset();
        sheet
    }

    const A: &str = "Cell Density (Cell Count/Litre)";
    const B: &str = "Volume (Litres)";

    #[test]
    fn test_op_apply() {
        assert_eq!(FormulaOp::Add.apply(1.5, 2.0), 3.5);
        assert_eq!(FormulaOp::Subtract.apply(1.5, 2.0), -0.5);
        assert_eq!(FormulaOp::Multiply.apply(1.5, 2.0), 3.0);
        assert_eq!(FormulaOp::Divide.apply(3.0, 2.0), 1.5);
        assert_eq!(FormulaOp::Divide.apply(3.0, 0.0), 0.0);
    }

    #[test]
    fn test_op_symbols() {
        for op in FormulaOp::ALL {
            assert_eq!(FormulaOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(FormulaOp::from_symbol("*"), None);
    }

    #[test]
    fn test_formula_from_elements() {
        let formula = ColumnFormula::from_elements(&tokens(&["A", "×", "B"])).unwrap();
        assert_eq!(formula, ColumnFormula::new("A", FormulaOp::Multiply, "B"));
        assert_eq!(formula.to_string(), "A × B");
        assert_eq!(formula.elements(), tokens(&["A", "×", "B"]));

        assert!(ColumnFormula::from_elements(&tokens(&["A", "+"])).is_none());
        assert!(ColumnFormula::from_elements(&tokens(&["A", "+", "B", "-", "C"])).is_none());
        assert!(ColumnFormula::from_elements(&tokens(&["A", "B", "C"])).is_none());
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(6.0, 2), "6.00");
        assert_eq!(format_fixed(1.0 / 3.0, 2), "0.33");
        assert_eq!(format_fixed(2.0 / 3.0, 2), "0.67");
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(-0.125, 2), "-0.13");
        assert_eq!(format_fixed(9.995, 2), "9.99");
        assert_eq!(format_fixed(99.5, 0), "100");
        assert_eq!(format_fixed(-0.0, 2), "0.00");
        assert_eq!(format_fixed(1234.5, 1), "1234.5");
    }

    #[test]
    fn test_increment_last_digit_carries() {
        assert_eq!(increment_last_digit("9.99"), "10.00");
        assert_eq!(increment_last_digit("-0.12"), "-0.13");
        assert_eq!(increment_last_digit("19"), "20");
    }

    #[test]
    fn test_apply_addition() {
        let mut sheet = make_sheet();
        let formula = ColumnFormula::new(A, FormulaOp::Add, B);
        let index = apply_column_formula(&mut sheet, &formula, "Total", &SessionConfig::default()).unwrap();

        assert_eq!(index, 3);
        let column = sheet.schema().get_column(3).unwrap();
        assert_eq!(column.name, "Total");
        assert_eq!(column.kind, ColumnKind::Data);
        assert_eq!(column.id.as_str(), "calculated_col_1");

        assert_eq!(sheet.get_cell(0, 3), Some("6.00"));
        assert_eq!(sheet.get_cell(1, 3), Some("3.50"));
        assert_eq!(sheet.get_cell(2, 3), Some("1.25"));
        assert_eq!(sheet.get_cell(3, 3), Some("10.00"));
    }

    #[test]
    fn test_apply_division_by_zero() {
        let mut sheet = make_sheet();
        let formula = ColumnFormula::new(A, FormulaOp::Divide, B);
        let index = apply_column_formula(&mut sheet, &formula, "Ratio", &SessionConfig::default()).unwrap();

        assert_eq!(sheet.get_cell(0, index), Some("0.50"));
        assert_eq!(sheet.get_cell(1, index), Some("0.00"));
        assert_eq!(sheet.get_cell(2, index), Some("0.00"));
        assert_eq!(sheet.get_cell(3, index), Some("0.00"));
    }

    #[test]
    fn test_apply_unknown_column_is_noop() {
        let mut sheet = make_sheet();
        let formula = ColumnFormula::new(A, FormulaOp::Add, "Missing");
        assert!(apply_column_formula(&mut sheet, &formula, "X", &SessionConfig::default()).is_none());
        assert_eq!(sheet.column_count(), 3);
        assert!(sheet.changeset().is_empty());
    }

    #[test]
    fn test_apply_twice_gets_distinct_ids_and_names() {
        let mut sheet = make_sheet();
        let config = SessionConfig::default();
        let formula = ColumnFormula::new(A, FormulaOp::Multiply, B);
        let first = apply_column_formula(&mut sheet, &formula, "", &config).unwrap();
        let second = apply_column_formula(&mut sheet, &formula, "", &config).unwrap();

        let first = sheet.schema().get_column(first).unwrap();
        let second = sheet.schema().get_column(second).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.name, "Custom Calculation");
        assert_eq!(second.name, "Custom Calculation (2)");
    }

    #[test]
    fn test_apply_on_empty_sheet() {
        let mut sheet = Sheet::new(Schema::time_series());
        let formula = ColumnFormula::new(A, FormulaOp::Subtract, B);
        let index = apply_column_formula(&mut sheet, &formula, "Diff", &SessionConfig::default()).unwrap();
        assert_eq!(index, 3);
        assert!(sheet.store().is_empty());
    }

    #[test]
    fn test_draft_editing() {
        let mut draft = FormulaDraft::new("Custom Calculation");
        draft.push(A);
        draft.push("÷");
        draft.push(B);
        assert_eq!(draft.formula_string(), format!("{} ÷ {}", A, B));
        assert!(draft.parse().is_some());

        assert_eq!(draft.remove(1), Some("÷".to_string()));
        assert_eq!(draft.remove(9), None);
        assert!(draft.parse().is_none());

        draft.clear();
        assert!(draft.is_empty());
        assert_eq!(draft.column_name(), "Custom Calculation");
    }

    #[test]
    fn test_recent_formulas_mru() {
        let mut recent = RecentFormulas::new(3);
        recent.remember(&tokens(&["A", "+", "B"]));
        recent.remember(&tokens(&["A", "-", "B"]));
        recent.remember(&tokens(&["A", "×", "B"]));
        recent.remember(&tokens(&["A", "+", "B"]));

        assert_eq!(recent.len(), 3);
        assert_eq!(recent.get(0).unwrap(), tokens(&["A", "+", "B"]).as_slice());
        assert_eq!(recent.get(1).unwrap(), tokens(&["A", "×", "B"]).as_slice());

        recent.remember(&tokens(&["B", "÷", "A"]));
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.get(2).unwrap(), tokens(&["A", "×", "B"]).as_slice());
        assert!(recent.iter().all(|f| f != tokens(&["A", "-", "B"]).as_slice()));
    }

    #[test]
    fn test_recent_formulas_ignores_short() {
        let mut recent = RecentFormulas::default();
        recent.remember(&tokens(&["A", "+"]));
        assert!(recent.is_empty());
    }
}

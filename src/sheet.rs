//! GridCalc Sheet
//!
//! A Sheet pairs a column schema with the sparse cell store and records
//! every mutation in a changeset. It is the only writer of the store: cells
//! are written through `set_cell`, and derived columns are appended through
//! `append_column`, which applies the schema change and the cell writes
//! together.
//!
//! # Examples
//!
//! ```
//! use gridcalc::{Schema, Sheet};
//!
//! let mut sheet = Sheet::new(Schema::time_series());
//! sheet.set_cell(0, 0, "2024-01-01T00:00:00Z").unwrap();
//! sheet.set_cell(0, 1, "1500").unwrap();
//!
//! assert_eq!(sheet.row_count(), 1);
//! assert_eq!(sheet.get_cell(0, 1), Some("1500"));
//! assert!(sheet.set_cell(0, 9, "out of schema").is_err());
//! ```

use crate::changeset::{Changeset, SheetChange};
use crate::schema::{ColumnDef, ColumnId, ColumnKind, Schema};
use crate::store::SparseCellStore;

pub struct Sheet {
    schema: Schema,
    store: SparseCellStore,
    /// Tracks changes for the presentation layer
    changeset: Changeset,
}

impl Sheet {
    /// Create an empty sheet.
    pub fn new(schema: Schema) -> Self {
        Sheet {
            schema,
            store: SparseCellStore::new(),
            changeset: Changeset::new(),
        }
    }

    /// Create a sheet over existing cells.
    ///
    /// Fails if any cell lies in a column the schema does not have.
    pub fn with_store(schema: Schema, store: SparseCellStore) -> Result<Self, String> {
        if let Some((key, _)) = store.iter().find(|(key, _)| key.col >= schema.len()) {
            return Err(format!(
                "Cell {} is outside the schema ({} columns)",
                key,
                schema.len()
            ));
        }
        Ok(Sheet {
            schema,
            store,
            changeset: Changeset::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &SparseCellStore {
        &self.store
    }

    /// Total rows, derived from the highest row index present.
    pub fn row_count(&self) -> usize {
        self.store.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    #[inline]
    pub fn get_cell(&self, row: usize, col: usize) -> Option<&str> {
        self.store.get(row, col)
    }

    pub fn get_cell_by_name(&self, row: usize, column: &str) -> Result<Option<&str>, String> {
        let col = self
            .schema
            .get_column_index(column)
            .ok_or_else(|| format!("Column '{}' not found", column))?;
        Ok(self.store.get(row, col))
    }

    /// Write a cell's raw text.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> Result<(), String> {
        if col >= self.schema.len() {
            return Err(format!(
                "Column index {} out of range [0, {})",
                col,
                self.schema.len()
            ));
        }

        let new_value = value.into();
        let old_value = self.store.set(row, col, new_value.clone());

        self.changeset.push(SheetChange::CellUpdated {
            row,
            col,
            old_value,
            new_value,
        });

        Ok(())
    }

    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) -> Result<(), String> {
        self.schema.rename_column(index, name)
    }

    /// Allocate a never-before-used column id.
    pub(crate) fn allocate_column_id(&mut self, prefix: &str) -> ColumnId {
        self.schema.allocate_id(prefix)
    }

    /// `base` if no column has that name yet, otherwise `base (2)`, `base (3)`, ...
    pub fn unique_column_name(&self, base: &str) -> String {
        if self.schema.get_column_index(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{} ({})", base, n))
            .find(|candidate| self.schema.get_column_index(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Append a column and its cell values (`values[row]`) in one step.
    ///
    /// The values are fully computed by the caller before this is invoked,
    /// so the schema and the store move from one consistent state to the
    /// next. Changes are recorded after both are applied.
    pub(crate) fn append_column(&mut self, column: ColumnDef, values: Vec<String>) -> usize {
        let index = self.schema.push(column.clone());

        let mut changes = Vec::with_capacity(values.len() + 1);
        changes.push(SheetChange::ColumnAppended { index, column });
        for (row, value) in values.into_iter().enumerate() {
            let old_value = self.store.set(row, index, value.clone());
            changes.push(SheetChange::CellUpdated {
                row,
                col: index,
                old_value,
                new_value: value,
            });
        }
        self.changeset.extend(changes);

        index
    }

    // ==================== Changes ====================

    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Take every pending change. Hosts that observe changes must drain
    /// regularly; past the change limit older records collapse into one
    /// `SheetChange::Truncated`.
    pub fn drain_changes(&mut self) -> Vec<SheetChange> {
        self.changeset.drain()
    }

    /// Cap the number of undrained changes kept.
    pub fn set_change_limit(&mut self, limit: usize) {
        self.changeset.set_limit(limit);
    }

    pub fn clear_changeset(&mut self) {
        self.changeset.clear();
    }

    // ==================== Serialization ====================

    /// Snapshot as JSON: the column list plus a row-major grid where
    /// missing cells are `null`.
    ///
    /// ```
    /// use gridcalc::{Schema, Sheet};
    ///
    /// let mut sheet = Sheet::new(Schema::time_series());
    /// sheet.set_cell(0, 0, "t0").unwrap();
    /// let json = sheet.to_json().unwrap();
    /// assert!(json.contains("\"time_col\""));
    /// assert!(json.contains("[\"t0\",null,null]"));
    /// ```
    pub fn to_json(&self) -> Result<String, String> {
        let columns = self.schema.len();
        let rows: Vec<Vec<Option<&str>>> = (0..self.row_count())
            .map(|row| (0..columns).map(|col| self.store.get(row, col)).collect())
            .collect();

        let snapshot = serde_json::json!({
            "columns": self.schema.columns(),
            "rows": rows,
        });

        serde_json::to_string(&snapshot).map_err(|e| format!("JSON serialization error: {}", e))
    }

    /// Create a sheet from CSV text.
    ///
    /// The header row names the columns. The first column is the time
    /// axis, every other column holds data. Empty fields are left missing.
    ///
    /// ```
    /// use gridcalc::Sheet;
    ///
    /// let csv = "Time,Density,Volume\nt0,2,5\nt1,4,\n";
    /// let sheet = Sheet::from_csv(csv).unwrap();
    /// assert_eq!(sheet.row_count(), 2);
    /// assert_eq!(sheet.get_cell(1, 2), None);
    /// ```
    pub fn from_csv(csv: &str) -> Result<Sheet, String> {
        let mut all_rows = parse_csv_rows(csv);

        if all_rows.is_empty() {
            return Err("CSV is empty".to_string());
        }

        let header = all_rows.remove(0);
        if header.iter().all(|name| name.trim().is_empty()) {
            return Err("CSV header is empty".to_string());
        }

        let mut columns = Vec::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            let name = name.trim();
            if columns.iter().any(|c: &ColumnDef| c.name == name) {
                return Err(format!("Duplicate column name '{}'", name));
            }
            let column = if idx == 0 {
                ColumnDef::new(name, ColumnKind::Time, "time_col")
            } else {
                ColumnDef::new(name, ColumnKind::Data, format!("var_col_{}", idx))
            };
            columns.push(column);
        }

        let mut store = SparseCellStore::new();
        for (row, fields) in all_rows.iter().enumerate() {
            if fields.len() > columns.len() {
                return Err(format!(
                    "Row {} has {} fields, but the header has {}",
                    row + 1,
                    fields.len(),
                    columns.len()
                ));
            }
            for (col, field) in fields.iter().enumerate() {
                if !field.is_empty() {
                    store.set(row, col, field.as_str());
                }
            }
        }

        Sheet::with_store(Schema::new(columns), store)
    }
}

impl std::fmt::Debug for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sheet {{ columns: {}, rows: {}, pending_changes: {} }}",
            self.schema.len(),
            self.row_count(),
            self.changeset.len()
        )
    }
}

/// Split CSV text into rows of fields, honouring quoted fields.
fn parse_csv_rows(csv: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut current_row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = csv.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // Escaped quote (double quote)
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current_field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => {
                in_quotes = true;
            }
            ',' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
            }
            '\n' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut current_row));
            }
            '\r' if !in_quotes => {}
            _ => {
                current_field.push(c);
            }
        }
    }

    if !current_field.is_empty() || !current_row.is_empty() {
        current_row.push(current_field);
        rows.push(current_row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_set_and_get() {
        let mut sheet = Sheet::new(Schema::time_series());
        sheet.set_cell(2, 1, "7").unwrap();

        assert_eq!(sheet.get_cell(2, 1), Some("7"));
        assert_eq!(sheet.get_cell_by_name(2, "Cell Density (Cell Count/Litre)").unwrap(), Some("7"));
        assert!(sheet.get_cell_by_name(2, "Nope").is_err());
        assert_eq!(sheet.row_count(), 3);
    }

    #[test]
    fn test_sheet_rejects_out_of_schema_writes() {
        let mut sheet = Sheet::new(Schema::time_series());
        assert!(sheet.set_cell(0, 3, "x").is_err());
        assert!(sheet.store().is_empty());
        assert!(sheet.changeset().is_empty());
    }

    #[test]
    fn test_with_store_validates_columns() {
        let mut store = SparseCellStore::new();
        store.set(0, 4, "x");
        assert!(Sheet::with_store(Schema::time_series(), store).is_err());
    }

    #[test]
    fn test_set_cell_records_change() {
        let mut sheet = Sheet::new(Schema::time_series());
        sheet.set_cell(0, 1, "1").unwrap();
        sheet.set_cell(0, 1, "2").unwrap();

        let changes = sheet.drain_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[1],
            SheetChange::CellUpdated {
                row: 0,
                col: 1,
                old_value: Some("1".to_string()),
                new_value: "2".to_string(),
            }
        );
        assert!(sheet.changeset().is_empty());
    }

    #[test]
    fn test_append_column() {
        let mut sheet = Sheet::new(Schema::time_series());
        let id = sheet.allocate_column_id("calculated_col");
        let index = sheet.append_column(
            ColumnDef::new("Derived", ColumnKind::Data, id.as_str()),
            vec!["1.00".to_string(), "2.00".to_string()],
        );

        assert_eq!(index, 3);
        assert_eq!(sheet.column_count(), 4);
        assert_eq!(sheet.get_cell(1, 3), Some("2.00"));

        let changes = sheet.drain_changes();
        assert_eq!(changes.len(), 3);
        assert!(changes[0].is_schema_change());
    }

    #[test]
    fn test_unique_column_name() {
        let mut sheet = Sheet::new(Schema::time_series());
        assert_eq!(sheet.unique_column_name("Ratio"), "Ratio");
        assert_eq!(sheet.unique_column_name("Time"), "Time (2)");

        let id = sheet.allocate_column_id("calculated_col");
        sheet.append_column(ColumnDef::new("Time (2)", ColumnKind::Data, id.as_str()), Vec::new());
        assert_eq!(sheet.unique_column_name("Time"), "Time (3)");
    }

    #[test]
    fn test_from_csv() {
        let csv = "Time,\"Density, cells/L\",Volume\r\nt0,2,5\r\nt1,\"4\",\r\n";
        let sheet = Sheet::from_csv(csv).unwrap();

        assert_eq!(sheet.column_count(), 3);
        assert_eq!(sheet.schema().get_column(1).unwrap().name, "Density, cells/L");
        assert_eq!(sheet.schema().get_column(0).unwrap().kind, ColumnKind::Time);
        assert_eq!(sheet.schema().get_column(2).unwrap().id.as_str(), "var_col_2");
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.get_cell(1, 1), Some("4"));
        assert_eq!(sheet.get_cell(1, 2), None);
    }

    #[test]
    fn test_from_csv_errors() {
        assert!(Sheet::from_csv("").is_err());
        assert!(Sheet::from_csv("A,A\n1,2").is_err());
        assert!(Sheet::from_csv("A,B\n1,2,3").is_err());
    }

    #[test]
    fn test_to_json_snapshot() {
        let mut sheet = Sheet::new(Schema::time_series());
        sheet.set_cell(0, 0, "t0").unwrap();
        sheet.set_cell(1, 2, "9").unwrap();

        let value: serde_json::Value = serde_json::from_str(&sheet.to_json().unwrap()).unwrap();
        assert_eq!(value["columns"][1]["kind"], "data");
        assert_eq!(value["rows"][0][0], "t0");
        assert!(value["rows"][0][1].is_null());
        assert_eq!(value["rows"][1][2], "9");
    }

    #[test]
    fn test_sheet_change_limit() {
        let mut sheet = Sheet::new(Schema::time_series());
        sheet.set_change_limit(4);
        for row in 0..10 {
            sheet.set_cell(row, 1, row.to_string()).unwrap();
        }

        let changes = sheet.drain_changes();
        assert!(changes.len() <= 4);
        assert!(matches!(changes[0], SheetChange::Truncated { .. }));
        assert_eq!(
            changes.last(),
            Some(&SheetChange::CellUpdated {
                row: 9,
                col: 1,
                old_value: None,
                new_value: "9".to_string(),
            })
        );
        assert!(sheet.changeset().is_empty());
    }
}

/// GridCalc Schema
///
/// An ordered list of column definitions. Order defines the column index
/// used for cell addressing. Column 0 is conventionally the time axis.
///
/// # Examples
///
/// ```
/// use gridcalc::{Schema, ColumnKind};
///
/// let schema = Schema::time_series();
/// assert_eq!(schema.len(), 3);
/// assert_eq!(schema.get_column_index("Volume (Litres)"), Some(2));
/// assert_eq!(schema.get_column(0).unwrap().kind, ColumnKind::Time);
/// ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Time,
    Data,
}

impl ColumnKind {
    /// Parse a column kind ("time" or "data").
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "time" => Ok(ColumnKind::Time),
            "data" => Ok(ColumnKind::Data),
            _ => Err(format!("Unknown column kind: '{}'. Use 'time' or 'data'", s)),
        }
    }
}

/// Stable column identity. Survives renames and is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        ColumnId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub id: ColumnId,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind, id: impl Into<String>) -> Self {
        ColumnDef {
            name: name.into(),
            kind,
            id: ColumnId::new(id),
        }
    }

    pub fn time(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Time, id)
    }

    pub fn data(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Data, id)
    }
}

/// Ordered column schema.
///
/// Tracks every id it has ever handed out so derived columns never reuse
/// an id, even one that appeared in the initial column list.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    #[serde(skip)]
    issued_ids: HashSet<ColumnId>,
    #[serde(skip)]
    next_derived: u64,
}

impl Schema {
    /// Creates a schema from an ordered column list.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        let issued_ids = columns.iter().map(|c| c.id.clone()).collect();
        Schema {
            columns,
            issued_ids,
            next_derived: 1,
        }
    }

    /// The default measurement layout: a time column and two data columns.
    pub fn time_series() -> Self {
        Schema::new(vec![
            ColumnDef::time("Time", "time_col"),
            ColumnDef::data("Cell Density (Cell Count/Litre)", "var_col_1"),
            ColumnDef::data("Volume (Litres)", "var_col_2"),
        ])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn get_column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    /// Index of the first column with exactly this name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get_column_by_id(&self, id: &ColumnId) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Produce a fresh id with the given prefix that has never been issued
    /// by this schema.
    pub(crate) fn allocate_id(&mut self, prefix: &str) -> ColumnId {
        loop {
            let candidate = ColumnId::new(format!("{}_{}", prefix, self.next_derived));
            self.next_derived += 1;
            if self.issued_ids.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Append a column and return its index.
    pub(crate) fn push(&mut self, column: ColumnDef) -> usize {
        self.issued_ids.insert(column.id.clone());
        self.columns.push(column);
        self.columns.len() - 1
    }

    /// Rename a column in place. The id is unchanged.
    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) -> Result<(), String> {
        let name = name.into();
        if let Some(existing) = self.get_column_index(&name) {
            if existing != index {
                return Err(format!("Column '{}' already exists", name));
            }
        }
        let column = self
            .columns
            .get_mut(index)
            .ok_or_else(|| format!("Column index {} out of range", index))?;
        column.name = name;
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::time_series()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::time_series();
        assert_eq!(schema.get_column_index("Time"), Some(0));
        assert_eq!(schema.get_column_index("Cell Density (Cell Count/Litre)"), Some(1));
        assert_eq!(schema.get_column_index("missing"), None);
        assert_eq!(schema.get_column(2).unwrap().id.as_str(), "var_col_2");
        assert!(schema.get_column(3).is_none());
    }

    #[test]
    fn test_allocate_id_skips_existing() {
        let mut schema = Schema::new(vec![
            ColumnDef::time("Time", "time_col"),
            ColumnDef::data("Prior", "calculated_col_1"),
        ]);

        let id = schema.allocate_id("calculated_col");
        assert_eq!(id.as_str(), "calculated_col_2");

        let next = schema.allocate_id("calculated_col");
        assert_ne!(id, next);
    }

    #[test]
    fn test_rename_keeps_id() {
        let mut schema = Schema::time_series();
        schema.rename_column(2, "Volume (mL)").unwrap();
        let column = schema.get_column(2).unwrap();
        assert_eq!(column.name, "Volume (mL)");
        assert_eq!(column.id.as_str(), "var_col_2");

        assert!(schema.rename_column(1, "Time").is_err());
        assert!(schema.rename_column(7, "x").is_err());
    }

    #[test]
    fn test_column_kind_from_str() {
        assert_eq!(ColumnKind::from_str("TIME").unwrap(), ColumnKind::Time);
        assert_eq!(ColumnKind::from_str("data").unwrap(), ColumnKind::Data);
        assert!(ColumnKind::from_str("text").is_err());
    }
}

/// GridCalc Sparse Cell Store
///
/// Cells are raw text values addressed by `(row, column)`. Only cells that
/// have been written are stored; a missing key means the cell is empty,
/// which is distinct from a cell holding `"0"` or `""`.
///
/// # Examples
///
/// ```
/// use gridcalc::SparseCellStore;
///
/// let mut store = SparseCellStore::new();
/// store.set(0, 0, "2024-01-01T00:00:00Z");
/// store.set(4, 1, "12.5");
///
/// assert_eq!(store.get(4, 1), Some("12.5"));
/// assert_eq!(store.get(3, 1), None);
/// assert_eq!(store.row_count(), 5);
/// ```

use std::collections::HashMap;
use std::fmt::Debug;

/// Address of a single cell.
///
/// The key is the pair itself, so two keys are equal exactly when both
/// coordinates are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        CellKey { row, col }
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.col, self.row)
    }
}

/// Sparse `(row, column) -> text` mapping.
///
/// Writes are visible to the next read immediately. No validation of the
/// stored text happens here; numeric parsing belongs to the callers.
#[derive(Clone, Default, PartialEq)]
pub struct SparseCellStore {
    cells: HashMap<CellKey, String>,
}

impl SparseCellStore {
    pub fn new() -> Self {
        SparseCellStore {
            cells: HashMap::new(),
        }
    }

    /// Raw text at `(row, col)`, or `None` if the cell was never written.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(&CellKey::new(row, col)).map(String::as_str)
    }

    /// Upsert a value, returning the previous one.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) -> Option<String> {
        self.cells.insert(CellKey::new(row, col), value.into())
    }

    /// Remove a value, returning it if it was present.
    pub fn remove(&mut self, row: usize, col: usize) -> Option<String> {
        self.cells.remove(&CellKey::new(row, col))
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells.contains_key(&CellKey::new(row, col))
    }

    /// Number of rows: highest row index present plus one, or 0 when empty.
    ///
    /// This is derived from the keys on every call rather than cached.
    pub fn row_count(&self) -> usize {
        self.cells
            .keys()
            .map(|key| key.row + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of stored (non-missing) cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Drop every cell whose column index is `>= column_count`.
    pub fn retain_columns(&mut self, column_count: usize) {
        self.cells.retain(|key, _| key.col < column_count);
    }

    /// Iterate over stored cells in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &str)> + '_ {
        self.cells.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

impl Debug for SparseCellStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SparseCellStore {{ cells: {}, rows: {} }}",
            self.len(),
            self.row_count()
        )
    }
}

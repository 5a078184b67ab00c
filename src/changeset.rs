/// Changeset - Change Log for GridCalc Sheets
///
/// Every mutation of a sheet is recorded as a `SheetChange` so the
/// presentation layer can refresh only what changed instead of re-reading
/// the whole grid.
///
/// # Change Types
///
/// - `CellUpdated`: a single cell was written
/// - `ColumnAppended`: a new column was added to the end of the schema
/// - `Truncated`: earlier changes were discarded; re-read the whole sheet
///
/// # Usage Pattern
///
/// 1. Sheet operations push `SheetChange` events
/// 2. Changes accumulate in the sheet's changeset buffer
/// 3. The observer calls `drain()` and applies the changes it cares about
///
/// The buffer only shrinks when drained or cleared. Once it holds `limit`
/// entries, the pending changes are replaced by a single `Truncated`
/// marker, so an observer that never drains costs bounded memory.

use crate::schema::ColumnDef;
use serde::Serialize;

/// Represents a single change to a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SheetChange {
    /// A cell value was written. `old_value` is `None` when the cell was missing.
    CellUpdated {
        row: usize,
        col: usize,
        old_value: Option<String>,
        new_value: String,
    },

    /// A column was appended at `index`
    ColumnAppended { index: usize, column: ColumnDef },

    /// `dropped` earlier changes were discarded because the buffer was full
    Truncated { dropped: usize },
}

impl SheetChange {
    /// Returns the column index affected by this change
    pub fn column_index(&self) -> Option<usize> {
        match self {
            SheetChange::CellUpdated { col, .. } => Some(*col),
            SheetChange::ColumnAppended { index, .. } => Some(*index),
            SheetChange::Truncated { .. } => None,
        }
    }

    /// Returns true if the change altered the schema
    pub fn is_schema_change(&self) -> bool {
        matches!(self, SheetChange::ColumnAppended { .. })
    }
}

/// Pending changes kept before older ones are folded into `Truncated`.
pub const DEFAULT_CHANGE_LIMIT: usize = 100_000;

/// A buffer of pending changes
#[derive(Debug, Clone)]
pub struct Changeset {
    changes: Vec<SheetChange>,
    /// Generation counter - incremented each time the buffer is cleared or drained
    generation: u64,
    limit: usize,
}

impl Changeset {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CHANGE_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Changeset {
            changes: Vec::new(),
            generation: 0,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
    }

    pub fn push(&mut self, change: SheetChange) {
        if self.changes.len() >= self.limit {
            self.truncate();
        }
        self.changes.push(change);
    }

    /// Append a batch of changes in order.
    pub fn extend(&mut self, changes: impl IntoIterator<Item = SheetChange>) {
        for change in changes {
            self.push(change);
        }
    }

    /// Fold every pending change into one `Truncated` marker.
    fn truncate(&mut self) {
        let dropped = match self.changes.first() {
            Some(SheetChange::Truncated { dropped }) => dropped + self.changes.len() - 1,
            _ => self.changes.len(),
        };
        log::debug!("Change buffer full; {} undrained changes dropped", dropped);
        self.changes.clear();
        self.changes.push(SheetChange::Truncated { dropped });
    }

    pub fn changes(&self) -> &[SheetChange] {
        &self.changes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.changes.clear();
        self.generation += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Drain changes, returning ownership and clearing the buffer
    pub fn drain(&mut self) -> Vec<SheetChange> {
        self.generation += 1;
        std::mem::take(&mut self.changes)
    }
}

impl Default for Changeset {
    fn default() -> Self {
        Self::new()
    }
}

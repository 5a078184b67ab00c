//! GridCalc Calculation Session
//!
//! A `CalcSession` owns the sheet and drives the calculation flow. The
//! grid widget feeds it selection changes; the toolkit UI feeds it
//! function choices, formula tokens and confirmations. The session keeps a
//! single `SessionState` whose variant carries exactly the data the
//! presentation layer needs for that screen.
//!
//! ```text
//!   Idle ──selection──▶ Selecting ──calculate──▶ ShowingResult ──dismiss──▶ Selecting
//!                          │   ▲                      ▲
//!                          │   └──cancel──┐           │ resolve
//!                          ├──calculate (2+ columns)──▶ Disambiguating ──reselect──▶ Idle
//!                          └──calculate (Other)──▶ Authoring ──apply/cancel──▶ Selecting
//! ```
//!
//! # Examples
//!
//! ```
//! use gridcalc::{CalcFunction, CalcSession, Region, Schema, Sheet};
//!
//! let mut sheet = Sheet::new(Schema::time_series());
//! sheet.set_cell(0, 0, "t0").unwrap();
//! sheet.set_cell(1, 0, "t1").unwrap();
//! sheet.set_cell(0, 1, "2").unwrap();
//! sheet.set_cell(1, 1, "4").unwrap();
//!
//! let mut session = CalcSession::new(sheet);
//! session.request_calculation(CalcFunction::Sum, vec![Region::column(1)]);
//!
//! let result = session.result().unwrap();
//! assert_eq!(result.value, 6.0);
//! assert_eq!(result.time_range.start, "t0");
//! assert_eq!(result.time_range.end, "t1");
//! ```

use crate::aggregate::{AggregateFunction, CalcFunction};
use crate::changeset::SheetChange;
use crate::config::SessionConfig;
use crate::formula::{apply_column_formula, format_fixed, ColumnFormula, FormulaDraft, RecentFormulas};
use crate::schema::{ColumnDef, Schema};
use crate::selection::{
    column_names_touched, is_whole_column, primary_column_name, time_range, values_in_column,
    values_in_selection, values_in_whole_column, whole_column_time_range, Region, TimeRange,
};
use crate::sheet::Sheet;
use serde::Serialize;

/// Outcome of an aggregate calculation, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub value: f64,
    pub function: AggregateFunction,
    pub column_name: String,
    pub time_range: TimeRange,
}

impl CalculationResult {
    /// The value with at most two fractional digits and no trailing zeros.
    ///
    /// ```
    /// use gridcalc::{AggregateFunction, CalculationResult, TimeRange};
    ///
    /// let result = CalculationResult {
    ///     value: 10.0 / 3.0,
    ///     function: AggregateFunction::Average,
    ///     column_name: "Volume".to_string(),
    ///     time_range: TimeRange::default(),
    /// };
    /// assert_eq!(result.formatted_value(), "3.33");
    /// ```
    pub fn formatted_value(&self) -> String {
        let fixed = format_fixed(self.value, 2);
        if !fixed.contains('.') {
            return fixed;
        }
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Where the calculation flow currently is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state")]
pub enum SessionState {
    /// No selection, or calculation mode is off.
    Idle,
    /// A selection exists and the toolkit is available.
    Selecting,
    /// The selection spans several data columns; the user must pick one.
    /// `selection` is the ambiguous selection the candidates came from.
    Disambiguating {
        function: AggregateFunction,
        candidates: Vec<String>,
        selection: Vec<Region>,
    },
    /// A result is ready for display.
    ShowingResult { result: CalculationResult },
    /// A derived-column formula is being assembled.
    Authoring { draft: FormulaDraft },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Selecting => "Selecting",
            SessionState::Disambiguating { .. } => "Disambiguating",
            SessionState::ShowingResult { .. } => "ShowingResult",
            SessionState::Authoring { .. } => "Authoring",
        }
    }
}

/// Destination for copied results. Writes are fire-and-forget: a failure
/// is logged and never affects the session.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

/// Everything the presentation layer reads, in one serializable value.
#[derive(Debug, Serialize)]
pub struct SessionView<'a> {
    pub state: &'a SessionState,
    pub function: CalcFunction,
    pub calculate_active: bool,
    pub selection: &'a [Region],
    pub is_whole_column: bool,
    pub columns: &'a [ColumnDef],
    pub recent_formulas: Vec<Vec<String>>,
}

pub struct CalcSession {
    sheet: Sheet,
    config: SessionConfig,
    selection: Vec<Region>,
    calculate_active: bool,
    function: CalcFunction,
    state: SessionState,
    recent_formulas: RecentFormulas,
}

impl CalcSession {
    /// Create a session with default settings. Calculation mode starts on.
    pub fn new(sheet: Sheet) -> Self {
        Self::with_config(sheet, SessionConfig::default())
    }

    pub fn with_config(mut sheet: Sheet, config: SessionConfig) -> Self {
        sheet.set_change_limit(config.change_log_limit);
        CalcSession {
            sheet,
            function: config.default_function,
            recent_formulas: RecentFormulas::new(config.recent_formula_capacity),
            config,
            selection: Vec::new(),
            calculate_active: true,
            state: SessionState::Idle,
        }
    }

    // ==================== Read surface ====================

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn schema(&self) -> &Schema {
        self.sheet.schema()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selection(&self) -> &[Region] {
        &self.selection
    }

    pub fn current_function(&self) -> CalcFunction {
        self.function
    }

    pub fn is_calculate_active(&self) -> bool {
        self.calculate_active
    }

    pub fn result(&self) -> Option<&CalculationResult> {
        match &self.state {
            SessionState::ShowingResult { result } => Some(result),
            _ => None,
        }
    }

    pub fn disambiguation_candidates(&self) -> Option<&[String]> {
        match &self.state {
            SessionState::Disambiguating { candidates, .. } => Some(candidates),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&FormulaDraft> {
        match &self.state {
            SessionState::Authoring { draft } => Some(draft),
            _ => None,
        }
    }

    /// Preview of the formula being authored.
    pub fn formula_string(&self) -> Option<String> {
        self.draft().map(FormulaDraft::formula_string)
    }

    /// Whether the current selection is one entire column.
    pub fn is_whole_column(&self) -> bool {
        is_whole_column(&self.selection, self.sheet.row_count())
    }

    pub fn recent_formulas(&self) -> &RecentFormulas {
        &self.recent_formulas
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            state: &self.state,
            function: self.function,
            calculate_active: self.calculate_active,
            selection: &self.selection,
            is_whole_column: self.is_whole_column(),
            columns: self.sheet.schema().columns(),
            recent_formulas: self.recent_formulas.to_vec(),
        }
    }

    pub fn view_json(&self) -> Result<String, String> {
        serde_json::to_string(&self.view()).map_err(|e| format!("JSON serialization error: {}", e))
    }

    /// Take the sheet changes recorded since the last drain.
    pub fn drain_changes(&mut self) -> Vec<SheetChange> {
        self.sheet.drain_changes()
    }

    /// Take the pending sheet changes as a JSON array.
    pub fn drain_changes_json(&mut self) -> Result<String, String> {
        let changes = self.sheet.drain_changes();
        serde_json::to_string(&changes).map_err(|e| format!("JSON serialization error: {}", e))
    }

    // ==================== Grid input ====================

    /// Turn calculation mode on or off. Turning it off abandons any
    /// pending dialog.
    pub fn set_calculate_active(&mut self, active: bool) {
        self.calculate_active = active;
        self.settle();
    }

    /// Replace the selection with the grid's current full region set.
    pub fn on_selection_changed(&mut self, selection: Vec<Region>) {
        self.selection = selection;
        if matches!(self.state, SessionState::Idle | SessionState::Selecting) {
            self.settle();
        }
    }

    /// Clear the selection and return to `Idle`, discarding any pending dialog.
    pub fn cancel_selection(&mut self) {
        self.selection.clear();
        self.settle();
    }

    /// Write a cell's raw text.
    pub fn edit_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> Result<(), String> {
        self.sheet.set_cell(row, col, value)
    }

    // ==================== Calculation ====================

    pub fn select_function(&mut self, function: CalcFunction) {
        self.function = function;
    }

    /// Select `function`, adopt `selection` and calculate. Any open
    /// result or dialog is replaced.
    pub fn request_calculation(&mut self, function: CalcFunction, selection: Vec<Region>) {
        self.selection = selection;
        self.select_function(function);
        self.settle();
        self.calculate();
    }

    /// Run the current function over the current selection.
    ///
    /// `Other` opens formula authoring. A selection spanning several data
    /// columns asks the user to pick one first.
    pub fn calculate(&mut self) {
        if self.state != SessionState::Selecting {
            log::debug!("Calculation requested in state {}; ignored", self.state.name());
            return;
        }

        let Some(function) = self.function.aggregate() else {
            self.begin_authoring();
            return;
        };

        let candidates = column_names_touched(&self.selection, self.sheet.schema());
        if candidates.len() > 1 {
            let selection = self.selection.clone();
            self.transition(SessionState::Disambiguating {
                function,
                candidates,
                selection,
            });
            return;
        }

        let column_name = primary_column_name(&self.selection, self.sheet.schema());
        let result = self.compute(&self.selection, function, None, column_name);
        self.transition(SessionState::ShowingResult { result });
    }

    /// Finish a disambiguation by calculating over the chosen column only,
    /// with the ambiguous selection's row bounds unchanged.
    pub fn resolve_disambiguation(&mut self, column_name: &str) {
        let SessionState::Disambiguating { function, selection, .. } = &self.state else {
            log::debug!("No disambiguation pending in state {}", self.state.name());
            return;
        };
        let function = *function;
        let selection = selection.clone();

        match self.sheet.schema().get_column_index(column_name) {
            Some(col) => {
                let result = self.compute(&selection, function, Some(col), column_name.to_string());
                self.selection = selection;
                self.transition(SessionState::ShowingResult { result });
            }
            None => {
                log::warn!("Column '{}' chosen for calculation does not exist", column_name);
                self.selection = selection;
                self.settle();
            }
        }
    }

    /// Abandon the disambiguation and clear the selection so the user can
    /// select again.
    pub fn reselect(&mut self) {
        if !matches!(self.state, SessionState::Disambiguating { .. }) {
            return;
        }
        self.selection.clear();
        self.settle();
    }

    /// Abandon the disambiguation, keeping the ambiguous selection.
    pub fn cancel_disambiguation(&mut self) {
        if let SessionState::Disambiguating { selection, .. } = &self.state {
            self.selection = selection.clone();
            self.settle();
        }
    }

    /// Close the result.
    pub fn dismiss_result(&mut self) {
        if matches!(self.state, SessionState::ShowingResult { .. }) {
            self.settle();
        }
    }

    /// Copy the displayed result's value. Returns whether the write succeeded.
    pub fn copy_result<C: Clipboard + ?Sized>(&self, clipboard: &mut C) -> bool {
        let Some(result) = self.result() else {
            return false;
        };
        match clipboard.write_text(&result.formatted_value()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to copy result: {}", e);
                false
            }
        }
    }

    fn compute(
        &self,
        selection: &[Region],
        function: AggregateFunction,
        column: Option<usize>,
        column_name: String,
    ) -> CalculationResult {
        let store = self.sheet.store();
        let total_rows = self.sheet.row_count();

        let (values, time_range) = if is_whole_column(selection, total_rows) {
            // Whole-column selections read every row and report the
            // sheet's full time span, whatever the region's own row bound.
            let col = column
                .or_else(|| selection[0].cols.map(|(start, _)| start))
                .unwrap_or(0);
            (
                values_in_whole_column(store, col, total_rows),
                whole_column_time_range(store, total_rows),
            )
        } else {
            let values = match column {
                Some(col) => values_in_column(selection, store, col),
                None => values_in_selection(selection, store),
            };
            (values, time_range(selection, store))
        };

        CalculationResult {
            value: function.apply(&values),
            function,
            column_name,
            time_range,
        }
    }

    // ==================== Formula authoring ====================

    /// Open formula authoring with an empty draft.
    pub fn begin_authoring(&mut self) {
        if self.state != SessionState::Selecting {
            log::debug!("Authoring requested in state {}; ignored", self.state.name());
            return;
        }
        let draft = FormulaDraft::new(self.config.default_column_name.clone());
        self.transition(SessionState::Authoring { draft });
    }

    pub fn push_formula_element(&mut self, element: impl Into<String>) {
        if let Some(draft) = self.draft_mut() {
            draft.push(element);
        }
    }

    pub fn remove_formula_element(&mut self, index: usize) {
        if let Some(draft) = self.draft_mut() {
            draft.remove(index);
        }
    }

    pub fn clear_formula(&mut self) {
        if let Some(draft) = self.draft_mut() {
            draft.clear();
        }
    }

    pub fn set_new_column_name(&mut self, name: impl Into<String>) {
        if let Some(draft) = self.draft_mut() {
            draft.set_column_name(name);
        }
    }

    /// Copy a remembered formula into the draft.
    pub fn load_recent_formula(&mut self, index: usize) -> bool {
        let Some(elements) = self.recent_formulas.get(index).map(<[String]>::to_vec) else {
            return false;
        };
        match self.draft_mut() {
            Some(draft) => {
                draft.load(&elements);
                true
            }
            None => false,
        }
    }

    /// Apply the draft. An empty draft is ignored; anything else closes
    /// authoring, whether or not the formula could be evaluated.
    ///
    /// Returns the index of the new column when one was created.
    pub fn apply_formula(&mut self) -> Option<usize> {
        let (elements, name) = match &self.state {
            SessionState::Authoring { draft } if !draft.is_empty() => {
                (draft.elements().to_vec(), draft.column_name().to_string())
            }
            SessionState::Authoring { .. } => return None,
            _ => {
                log::debug!("No formula being authored in state {}", self.state.name());
                return None;
            }
        };

        let index = self.run_formula(&elements, &name);
        self.finish_authoring();
        index
    }

    /// Abandon authoring without touching the sheet.
    pub fn cancel_authoring(&mut self) {
        if matches!(self.state, SessionState::Authoring { .. }) {
            self.settle();
        }
    }

    /// Evaluate a complete token list directly, bypassing the draft.
    pub fn request_column_formula(&mut self, elements: &[String], column_name: &str) -> Option<usize> {
        let index = self.run_formula(elements, column_name);
        if matches!(self.state, SessionState::Authoring { .. }) {
            self.finish_authoring();
        }
        index
    }

    fn run_formula(&mut self, elements: &[String], column_name: &str) -> Option<usize> {
        let Some(formula) = ColumnFormula::from_elements(elements) else {
            log::debug!("Formula '{}' is not of the form [column, op, column]", elements.join(" "));
            return None;
        };
        let index = apply_column_formula(&mut self.sheet, &formula, column_name, &self.config)?;
        self.recent_formulas.remember(elements);
        Some(index)
    }

    fn finish_authoring(&mut self) {
        if self.function == CalcFunction::Other {
            self.function = self.config.default_function;
        }
        self.settle();
    }

    fn draft_mut(&mut self) -> Option<&mut FormulaDraft> {
        match &mut self.state {
            SessionState::Authoring { draft } => Some(draft),
            _ => None,
        }
    }

    // ==================== State ====================

    /// Fall back to `Selecting` or `Idle` depending on mode and selection.
    fn settle(&mut self) {
        let next = if self.calculate_active && !self.selection.is_empty() {
            SessionState::Selecting
        } else {
            SessionState::Idle
        };
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.name() != next.name() {
            log::debug!("Session {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
    }
}

impl std::fmt::Debug for CalcSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CalcSession {{ state: {}, function: {}, regions: {}, sheet: {:?} }}",
            self.state.name(),
            self.function,
            self.selection.len(),
            self.sheet
        )
    }
}

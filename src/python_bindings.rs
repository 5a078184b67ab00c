/// Python bindings for GridCalc using PyO3
///
/// Exposes a `Session` class carrying the request and read surfaces of
/// `CalcSession`, plus a small `Region` value class for building
/// selections from Python.

use pyo3::prelude::*;
use pyo3::exceptions::{PyIndexError, PyValueError};
use pyo3::types::PyDict;

use crate::aggregate::CalcFunction;
use crate::config::SessionConfig;
use crate::schema::Schema;
use crate::selection::Region as RustRegion;
use crate::session::{CalcSession, CalculationResult, Clipboard, SessionState};
use crate::sheet::Sheet;

// ============================================================================
// Region
// ============================================================================

/// A rectangular selection span. Omitted bounds leave that axis unbounded.
///
/// Examples:
///     Region(0, 4, 1, 1)            # rows 0-4 of column 1
///     Region(start_col=2, end_col=2)  # all of column 2
///     Region.column(2)              # same
#[pyclass(name = "Region")]
#[derive(Clone)]
pub struct PyRegion {
    inner: RustRegion,
}

fn span(start: Option<usize>, end: Option<usize>, axis: &str) -> PyResult<Option<(usize, usize)>> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(s), Some(e)) if s <= e => Ok(Some((s, e))),
        (Some(s), Some(e)) => Err(PyValueError::new_err(format!(
            "{} range start {} is after end {}",
            axis, s, e
        ))),
        _ => Err(PyValueError::new_err(format!(
            "{} range needs both a start and an end",
            axis
        ))),
    }
}

#[pymethods]
impl PyRegion {
    #[new]
    #[pyo3(signature = (start_row=None, end_row=None, start_col=None, end_col=None))]
    fn new(
        start_row: Option<usize>,
        end_row: Option<usize>,
        start_col: Option<usize>,
        end_col: Option<usize>,
    ) -> PyResult<Self> {
        Ok(PyRegion {
            inner: RustRegion {
                rows: span(start_row, end_row, "Row")?,
                cols: span(start_col, end_col, "Column")?,
            },
        })
    }

    /// A single cell
    #[staticmethod]
    fn cell(row: usize, col: usize) -> Self {
        PyRegion { inner: RustRegion::cell(row, col) }
    }

    /// An entire column, without a row bound
    #[staticmethod]
    fn column(col: usize) -> Self {
        PyRegion { inner: RustRegion::column(col) }
    }

    #[getter]
    fn rows(&self) -> Option<(usize, usize)> {
        self.inner.rows
    }

    #[getter]
    fn cols(&self) -> Option<(usize, usize)> {
        self.inner.cols
    }

    fn __repr__(&self) -> String {
        format!("Region(rows={:?}, cols={:?})", self.inner.rows, self.inner.cols)
    }

    fn __eq__(&self, other: &PyRegion) -> bool {
        self.inner == other.inner
    }
}

fn to_regions(regions: Vec<PyRegion>) -> Vec<RustRegion> {
    regions.into_iter().map(|r| r.inner).collect()
}

// ============================================================================
// Clipboard adapter
// ============================================================================

/// Forwards copied text to a Python callable.
struct CallableClipboard<'py> {
    callback: Bound<'py, PyAny>,
}

impl Clipboard for CallableClipboard<'_> {
    fn write_text(&mut self, text: &str) -> Result<(), String> {
        self.callback
            .call1((text,))
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

fn result_to_dict<'py>(py: Python<'py>, result: &CalculationResult) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("value", result.value)?;
    dict.set_item("function", result.function.label())?;
    dict.set_item("column_name", &result.column_name)?;
    dict.set_item("time_start", &result.time_range.start)?;
    dict.set_item("time_end", &result.time_range.end)?;
    dict.set_item("formatted", result.formatted_value())?;
    Ok(dict)
}

fn parse_function(name: &str) -> PyResult<CalcFunction> {
    CalcFunction::from_str(name).map_err(PyValueError::new_err)
}

// ============================================================================
// Session
// ============================================================================

/// A calculation session over one sheet.
///
/// Args:
///     csv: Optional CSV text to seed the sheet; the default time-series
///          columns are used otherwise
///     config: Optional JSON configuration
///
/// Examples:
///     session = Session("Time,Density\n08:00,2\n09:00,4\n")
///     session.request_calculation("sum", [Region.column(1)])
///     session.result()["value"]   # 6.0
#[pyclass(name = "Session", unsendable)]
pub struct PySession {
    inner: CalcSession,
}

#[pymethods]
impl PySession {
    #[new]
    #[pyo3(signature = (csv=None, config=None))]
    fn new(csv: Option<&str>, config: Option<&str>) -> PyResult<Self> {
        let sheet = match csv {
            Some(text) => Sheet::from_csv(text).map_err(PyValueError::new_err)?,
            None => Sheet::new(Schema::time_series()),
        };
        let config = match config {
            Some(json) => SessionConfig::from_json(json).map_err(PyValueError::new_err)?,
            None => SessionConfig::default(),
        };
        Ok(PySession {
            inner: CalcSession::with_config(sheet, config),
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "Session(state='{}', rows={}, columns={})",
            self.inner.state().name(),
            self.inner.sheet().row_count(),
            self.inner.schema().len()
        )
    }

    // ---------------- Sheet ----------------

    /// Ordered column names
    fn column_names(&self) -> Vec<String> {
        self.inner
            .schema()
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn row_count(&self) -> usize {
        self.inner.sheet().row_count()
    }

    fn get_cell(&self, row: usize, col: usize) -> Option<String> {
        self.inner.sheet().get_cell(row, col).map(str::to_string)
    }

    fn edit_cell(&mut self, row: usize, col: usize, value: String) -> PyResult<()> {
        self.inner
            .edit_cell(row, col, value)
            .map_err(PyIndexError::new_err)
    }

    /// Schema and cells as a JSON string
    fn to_json(&self) -> PyResult<String> {
        self.inner.sheet().to_json().map_err(PyValueError::new_err)
    }

    /// Pending sheet changes as a JSON array, clearing the buffer
    fn drain_changes(&mut self) -> PyResult<String> {
        self.inner.drain_changes_json().map_err(PyValueError::new_err)
    }

    // ---------------- Requests ----------------

    fn on_selection_changed(&mut self, regions: Vec<PyRegion>) {
        self.inner.on_selection_changed(to_regions(regions));
    }

    fn set_calculate_active(&mut self, active: bool) {
        self.inner.set_calculate_active(active);
    }

    fn select_function(&mut self, function: &str) -> PyResult<()> {
        self.inner.select_function(parse_function(function)?);
        Ok(())
    }

    fn calculate(&mut self) {
        self.inner.calculate();
    }

    fn request_calculation(&mut self, function: &str, regions: Vec<PyRegion>) -> PyResult<()> {
        let function = parse_function(function)?;
        self.inner.request_calculation(function, to_regions(regions));
        Ok(())
    }

    /// Apply `[column, op, column]` directly; returns the new column index
    fn request_column_formula(&mut self, elements: Vec<String>, column_name: &str) -> Option<usize> {
        self.inner.request_column_formula(&elements, column_name)
    }

    fn resolve_disambiguation(&mut self, column_name: &str) {
        self.inner.resolve_disambiguation(column_name);
    }

    fn cancel_disambiguation(&mut self) {
        self.inner.cancel_disambiguation();
    }

    fn reselect(&mut self) {
        self.inner.reselect();
    }

    fn cancel_selection(&mut self) {
        self.inner.cancel_selection();
    }

    fn dismiss_result(&mut self) {
        self.inner.dismiss_result();
    }

    /// Pass the formatted result to `callback`; returns whether it succeeded
    fn copy_result(&self, callback: Bound<'_, PyAny>) -> bool {
        let mut clipboard = CallableClipboard { callback };
        self.inner.copy_result(&mut clipboard)
    }

    // ---------------- Formula authoring ----------------

    fn begin_authoring(&mut self) {
        self.inner.begin_authoring();
    }

    fn push_formula_element(&mut self, element: String) {
        self.inner.push_formula_element(element);
    }

    fn remove_formula_element(&mut self, index: usize) {
        self.inner.remove_formula_element(index);
    }

    fn clear_formula(&mut self) {
        self.inner.clear_formula();
    }

    fn set_new_column_name(&mut self, name: String) {
        self.inner.set_new_column_name(name);
    }

    fn load_recent_formula(&mut self, index: usize) -> bool {
        self.inner.load_recent_formula(index)
    }

    fn apply_formula(&mut self) -> Option<usize> {
        self.inner.apply_formula()
    }

    fn cancel_authoring(&mut self) {
        self.inner.cancel_authoring();
    }

    // ---------------- Read surface ----------------

    /// Current state name: Idle, Selecting, Disambiguating, ShowingResult or Authoring
    fn state(&self) -> &'static str {
        self.inner.state().name()
    }

    fn current_function(&self) -> &'static str {
        self.inner.current_function().label()
    }

    fn result<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        match self.inner.state() {
            SessionState::ShowingResult { result } => Ok(Some(result_to_dict(py, result)?)),
            _ => Ok(None),
        }
    }

    fn disambiguation_candidates(&self) -> Option<Vec<String>> {
        self.inner.disambiguation_candidates().map(<[String]>::to_vec)
    }

    fn is_whole_column(&self) -> bool {
        self.inner.is_whole_column()
    }

    fn formula_string(&self) -> Option<String> {
        self.inner.formula_string()
    }

    fn recent_formulas(&self) -> Vec<Vec<String>> {
        self.inner.recent_formulas().to_vec()
    }

    /// Full presentation snapshot as a JSON string
    fn view_json(&self) -> PyResult<String> {
        self.inner.view_json().map_err(PyValueError::new_err)
    }
}

// ============================================================================
// Module
// ============================================================================

#[pymodule]
fn gridcalc(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyRegion>()?;
    m.add_class::<PySession>()?;
    Ok(())
}

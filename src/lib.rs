/// GridCalc - Selection-to-Calculation Core for Time-Series Grids
///
/// Turns rectangular grid selections into numeric inputs, resolves
/// selections that span several data columns, runs aggregates and
/// two-column formulas, and writes derived columns back into a sparse
/// cell store.

pub mod store;
pub mod schema;
pub mod changeset;
pub mod sheet;
pub mod selection;
pub mod aggregate;
pub mod formula;
pub mod config;
pub mod session;

pub use store::{CellKey, SparseCellStore};
pub use schema::{ColumnDef, ColumnId, ColumnKind, Schema};
pub use changeset::{Changeset, SheetChange};
pub use sheet::Sheet;
pub use selection::{Region, TimeRange};
pub use aggregate::{aggregate, AggregateFunction, CalcFunction};
pub use formula::{apply_column_formula, ColumnFormula, FormulaDraft, FormulaOp, RecentFormulas};
pub use config::SessionConfig;
pub use session::{CalcSession, CalculationResult, Clipboard, SessionState, SessionView};

// Python bindings - only when python feature is enabled
#[cfg(feature = "python")]
mod python_bindings;
#[cfg(feature = "python")]
pub use python_bindings::*;

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_end_to_end_whole_column_sum() {
        let mut store = SparseCellStore::new();
        store.set(0, 0, "t0");
        store.set(1, 0, "t1");
        store.set(0, 1, "2");
        store.set(1, 1, "4");

        let sheet = Sheet::with_store(Schema::time_series(), store).unwrap();
        assert_eq!(sheet.row_count(), 2);

        let mut session = CalcSession::new(sheet);
        session.request_calculation(CalcFunction::Sum, vec![Region::column(1)]);

        let result = session.result().unwrap();
        assert_eq!(result.value, 6.0);
        assert_eq!(result.time_range, TimeRange::new("t0", "t1"));
        assert_eq!(result.column_name, "Cell Density (Cell Count/Litre)");
    }

    #[test]
    fn test_complete_workflow() {
        let csv = "Time,Density,Volume\n\
                   08:00,100,2\n\
                   09:00,150,0\n\
                   10:00,n/a,4\n\
                   11:00,300,5\n";
        let sheet = Sheet::from_csv(csv).unwrap();
        let mut session = CalcSession::new(sheet);

        // Partial selection skips the non-numeric cell
        session.request_calculation(CalcFunction::Average, vec![Region::cells(0, 2, 1, 1)]);
        let result = session.result().unwrap().clone();
        assert_eq!(result.value, 125.0);
        assert_eq!(result.time_range, TimeRange::new("08:00", "10:00"));
        session.dismiss_result();

        // Two rectangles over two columns need a choice
        session.request_calculation(
            CalcFunction::Max,
            vec![Region::cells(0, 1, 1, 1), Region::cells(2, 3, 2, 2)],
        );
        assert_eq!(
            session.disambiguation_candidates().unwrap(),
            &["Density".to_string(), "Volume".to_string()]
        );
        session.resolve_disambiguation("Volume");
        let result = session.result().unwrap();
        assert_eq!(result.value, 5.0);
        assert_eq!(result.time_range, TimeRange::new("08:00", "11:00"));
        session.dismiss_result();

        // Derived column through the authoring flow
        session.request_calculation(CalcFunction::Other, vec![Region::cell(0, 1)]);
        for token in ["Density", "÷", "Volume"] {
            session.push_formula_element(token);
        }
        session.set_new_column_name("Per Litre");
        let index = session.apply_formula().unwrap();

        let expected = ["50.00", "0.00", "0.00", "60.00"];
        for (row, value) in expected.iter().enumerate() {
            assert_eq!(session.sheet().get_cell(row, index), Some(*value));
        }

        // The new column is immediately selectable
        session.request_calculation(CalcFunction::Sum, vec![Region::column(index)]);
        assert_eq!(session.result().unwrap().value, 110.0);
        assert_eq!(session.result().unwrap().column_name, "Per Litre");
    }

    #[test]
    fn test_formula_round_trip_two_decimals() {
        let mut sheet = Sheet::new(Schema::time_series());
        let pairs = [(1.005, 2.0), (0.1, 0.2), (-3.333, 1.0), (12.0, 0.125)];
        for (row, (a, b)) in pairs.iter().enumerate() {
            sheet.set_cell(row, 0, format!("t{}", row)).unwrap();
            sheet.set_cell(row, 1, a.to_string()).unwrap();
            sheet.set_cell(row, 2, b.to_string()).unwrap();
        }

        let mut session = CalcSession::new(sheet);
        let index = session
            .request_column_formula(
                &tokens(&["Cell Density (Cell Count/Litre)", "+", "Volume (Litres)"]),
                "Sum",
            )
            .unwrap();

        for (row, (a, b)) in pairs.iter().enumerate() {
            let stored = session.sheet().get_cell(row, index).unwrap();
            let parsed: f64 = stored.parse().unwrap();
            assert!((parsed - (a + b)).abs() <= 0.005 + 1e-9, "row {}: {}", row, stored);
            assert_eq!(stored.split('.').nth(1).map(str::len), Some(2));
        }
    }

    #[test]
    fn test_derived_ids_never_reused() {
        let mut session = CalcSession::new(Sheet::new(Schema::time_series()));
        session.edit_cell(0, 1, "1").unwrap();
        session.edit_cell(0, 2, "2").unwrap();

        let formula = tokens(&["Cell Density (Cell Count/Litre)", "×", "Volume (Litres)"]);
        let first = session.request_column_formula(&formula, "").unwrap();
        let second = session.request_column_formula(&formula, "").unwrap();

        let schema = session.schema();
        let a = schema.get_column(first).unwrap();
        let b = schema.get_column(second).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "Custom Calculation");
        assert_eq!(b.name, "Custom Calculation (2)");

        // Recent list dedupes the repeated formula
        assert_eq!(session.recent_formulas().len(), 1);
    }

    #[test]
    fn test_out_of_schema_write_rejected() {
        let mut session = CalcSession::new(Sheet::new(Schema::time_series()));
        assert!(session.edit_cell(0, 3, "1").is_err());
        assert_eq!(session.sheet().row_count(), 0);
        assert!(session.drain_changes().is_empty());
    }
}

/// Derived Columns Example
///
/// This example demonstrates:
/// - Authoring a two-column formula token by token
/// - Reusing a formula from the recent list
/// - Observing the sheet changes a derived column produces

use gridcalc::{CalcFunction, CalcSession, Region, Schema, Sheet, SheetChange};

const DENSITY: &str = "Cell Density (Cell Count/Litre)";
const VOLUME: &str = "Volume (Litres)";

fn main() {
    println!("=== GridCalc Derived Columns Example ===\n");

    let mut sheet = Sheet::new(Schema::time_series());
    let readings = [(1200.0, 1.5), (1350.0, 1.6), (1480.0, 0.0), (1710.0, 2.0)];
    for (row, (density, volume)) in readings.iter().enumerate() {
        sheet.set_cell(row, 0, format!("{:02}:00", 8 + row)).unwrap();
        sheet.set_cell(row, 1, density.to_string()).unwrap();
        sheet.set_cell(row, 2, volume.to_string()).unwrap();
    }
    sheet.clear_changeset();

    let mut session = CalcSession::new(sheet);

    // 1. Author "density × volume"
    println!("1. Authoring total cell count...");
    session.request_calculation(CalcFunction::Other, vec![Region::cell(0, 1)]);
    session.push_formula_element(DENSITY);
    session.push_formula_element("×");
    session.push_formula_element(VOLUME);
    session.set_new_column_name("Total Cells");
    println!("   Formula: {}", session.formula_string().unwrap_or_default());

    let total = session.apply_formula().unwrap();
    println!("   Created column {} -> state {}\n", total, session.state().name());

    // 2. Reuse the formula with a different operator
    println!("2. Reusing the recent formula...");
    session.request_calculation(CalcFunction::Other, vec![Region::cell(0, 1)]);
    session.load_recent_formula(0);
    session.remove_formula_element(1);
    println!("   Draft after removing the operator: {}", session.formula_string().unwrap_or_default());
    session.clear_formula();
    for token in [DENSITY, "÷", VOLUME] {
        session.push_formula_element(token);
    }
    let ratio = session.apply_formula().unwrap();
    println!("   Created column {} ('{}')\n", ratio, session.schema().get_column(ratio).unwrap().name);

    // 3. Inspect materialized values
    println!("3. Derived values...");
    for row in 0..session.sheet().row_count() {
        println!(
            "   {}  total={:<10} ratio={}",
            session.sheet().get_cell(row, 0).unwrap_or(""),
            session.sheet().get_cell(row, total).unwrap_or(""),
            session.sheet().get_cell(row, ratio).unwrap_or("")
        );
    }
    println!();

    // 4. Change log
    println!("4. Changes since seeding...");
    for change in session.drain_changes() {
        if let SheetChange::ColumnAppended { index, column } = change {
            println!("   Column {} appended: '{}' ({})", index, column.name, column.id);
        }
    }
    println!("   Recent formulas: {:?}", session.recent_formulas().to_vec());

    println!("\n=== Example Complete ===");
}

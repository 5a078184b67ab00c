/// Performance Example
///
/// This example demonstrates:
/// - Cost of whole-column aggregation on a large sparse sheet
/// - Cost of multi-region selections
/// - Cost of materializing a derived column

use gridcalc::{CalcFunction, CalcSession, Region, Schema, Sheet};
use std::time::Instant;

fn main() {
    println!("=== GridCalc Performance Example ===\n");

    let n = 100_000;

    // 1. Fill the sheet
    println!("1. Filling {} rows", n);
    let start = Instant::now();
    let mut sheet = Sheet::new(Schema::time_series());
    for row in 0..n {
        sheet.set_cell(row, 0, format!("t{}", row)).unwrap();
        sheet.set_cell(row, 1, format!("{}", row as f64 * 1.5)).unwrap();
        // Every tenth volume reading is missing
        if row % 10 != 0 {
            sheet.set_cell(row, 2, format!("{}", (row % 7) as f64 + 0.5)).unwrap();
        }
    }
    sheet.clear_changeset();
    println!("   Fill: {:?}\n", start.elapsed());

    let mut session = CalcSession::new(sheet);

    // 2. Whole column
    println!("2. Whole-column aggregates");
    for function in [CalcFunction::Sum, CalcFunction::Average, CalcFunction::Count] {
        let start = Instant::now();
        session.request_calculation(function, vec![Region::column(2)]);
        let elapsed = start.elapsed();
        let value = session.result().map(|r| r.value).unwrap_or_default();
        println!("   {:<8} = {:<14.2} {:?}", function.label(), value, elapsed);
        session.dismiss_result();
    }
    println!();

    // 3. Many small regions
    println!("3. 1000 disjoint regions");
    let regions: Vec<Region> = (0..1000).map(|i| Region::cells(i * 50, i * 50 + 9, 1, 1)).collect();
    let start = Instant::now();
    session.request_calculation(CalcFunction::Sum, regions);
    println!("   Sum = {:.2} in {:?}\n", session.result().map(|r| r.value).unwrap_or_default(), start.elapsed());
    session.dismiss_result();

    // 4. Derived column
    println!("4. Derived column over {} rows", n);
    let elements: Vec<String> = ["Cell Density (Cell Count/Litre)", "×", "Volume (Litres)"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let start = Instant::now();
    let index = session.request_column_formula(&elements, "Product");
    println!("   Column {:?} in {:?}", index, start.elapsed());
    println!("   Changes recorded: {}", session.drain_changes().len());

    println!("\n=== Example Complete ===");
}

/// Basic Session Example
///
/// This example demonstrates:
/// - Seeding a sheet from CSV
/// - Aggregating a partial selection and a whole column
/// - Resolving a selection that spans two data columns

use gridcalc::{CalcFunction, CalcSession, Region, Sheet};

fn print_result(session: &CalcSession) {
    match session.result() {
        Some(result) => println!(
            "   {} of '{}' = {} (from {} to {})\n",
            result.function,
            result.column_name,
            result.formatted_value(),
            result.time_range.start,
            result.time_range.end
        ),
        None => println!("   No result ({})\n", session.state().name()),
    }
}

fn main() {
    println!("=== GridCalc Basic Session Example ===\n");

    // 1. Load a sheet
    println!("1. Loading sheet...");
    let csv = "Time,Cell Density (Cell Count/Litre),Volume (Litres)\n\
               08:00,1200,1.5\n\
               09:00,1350,1.6\n\
               10:00,pending,1.8\n\
               11:00,1710,2.0\n\
               12:00,1900,2.1\n";
    let sheet = Sheet::from_csv(csv).unwrap();
    println!("   {} rows, columns: {:?}\n", sheet.row_count(), sheet.schema().get_column_names());

    let mut session = CalcSession::new(sheet);

    // 2. Partial selection
    println!("2. Average of density, rows 1-3...");
    session.request_calculation(CalcFunction::Average, vec![Region::cells(1, 3, 1, 1)]);
    print_result(&session);
    session.dismiss_result();

    // 3. Whole column
    println!("3. Max of the whole volume column...");
    session.request_calculation(CalcFunction::Max, vec![Region::column(2)]);
    println!("   Whole column: {}", session.is_whole_column());
    print_result(&session);
    session.dismiss_result();

    // 4. Disambiguation
    println!("4. Sum over a block covering both data columns...");
    session.request_calculation(CalcFunction::Sum, vec![Region::cells(0, 1, 0, 2)]);
    println!("   Candidates: {:?}", session.disambiguation_candidates().unwrap_or_default());
    session.resolve_disambiguation("Volume (Litres)");
    print_result(&session);
    session.dismiss_result();

    // 5. Snapshot for the presentation layer
    println!("5. Session view...");
    println!("   {}", session.view_json().unwrap());

    println!("\n=== Example Complete ===");
}

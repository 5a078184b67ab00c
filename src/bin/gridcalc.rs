/// GridCalc command-line runner
///
/// Loads a CSV sheet and prints, as JSON, the whole-column result of one
/// aggregate for every data column.
///
/// Usage: gridcalc <file.csv> [sum|average|count|max|min]
///
/// `GRIDCALC_CONFIG` may name a JSON session configuration file.

use gridcalc::{CalcFunction, CalcSession, CalculationResult, Region, SessionConfig, Sheet};

fn load_config() -> Result<SessionConfig, String> {
    match std::env::var("GRIDCALC_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| format!("Cannot read config '{}': {}", path, e))?;
            SessionConfig::from_json(&json)
        }
        Err(_) => Ok(SessionConfig::default()),
    }
}

fn run(args: &[String]) -> Result<String, String> {
    let path = args
        .get(1)
        .ok_or_else(|| "Usage: gridcalc <file.csv> [sum|average|count|max|min]".to_string())?;

    let config = load_config()?;
    let function = match args.get(2) {
        Some(name) => CalcFunction::from_str(name)?,
        None => config.default_function,
    };
    if function.aggregate().is_none() {
        return Err("Derived columns cannot be requested from the command line".to_string());
    }

    let csv = std::fs::read_to_string(path).map_err(|e| format!("Cannot read '{}': {}", path, e))?;
    let sheet = Sheet::from_csv(&csv)?;
    log::info!(
        "Loaded '{}': {} rows, {} columns",
        path,
        sheet.row_count(),
        sheet.column_count()
    );

    let mut session = CalcSession::with_config(sheet, config);
    let mut results: Vec<CalculationResult> = Vec::new();
    for col in 1..session.schema().len() {
        session.request_calculation(function, vec![Region::column(col)]);
        match session.result() {
            Some(result) => results.push(result.clone()),
            None => log::warn!("No result for column {}", col),
        }
        session.dismiss_result();
    }

    serde_json::to_string_pretty(&results).map_err(|e| format!("JSON serialization error: {}", e))
}

fn main() {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

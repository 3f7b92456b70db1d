use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use super::OutputFormat;

/// Print a list of rows in the selected format
pub fn print_output<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(rows).unwrap();
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", Table::new(rows));
        }
        OutputFormat::Plain => {
            // One row per line, field values joined by pipes
            let json = serde_json::to_value(rows).unwrap();
            for item in json.as_array().into_iter().flatten() {
                if let Some(obj) = item.as_object() {
                    let values: Vec<String> = obj
                        .values()
                        .map(|v| match v {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Null => String::new(),
                            other => other.to_string(),
                        })
                        .collect();
                    println!("{}", values.join("|"));
                }
            }
        }
    }
}

/// Print a single item in the selected format
pub fn print_single<T: Serialize>(data: &T, _format: OutputFormat) {
    let json = serde_json::to_string_pretty(data).unwrap();
    println!("{}", json);
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

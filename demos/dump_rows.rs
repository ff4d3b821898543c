//! Dump Rows Example
//!
//! This example prints every row of one worksheet as a JSON array per line.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example dump_rows -- input.xlsx
//! cargo run --example dump_rows -- input.xlsx --sheet-index 1
//! cargo run --example dump_rows -- input.xlsx --sheet-name "Data" --raw-dates
//! ```

use std::io::{self, BufWriter, Write};
use std::process;
use xlsxstream::{ReaderBuilder, SheetSelector, XlsxStreamError};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <input.xlsx> [options]", args[0]);
        eprintln!("\nOptions:");
        eprintln!("  --sheet-index <n>    Select sheet by index (0-based, default 0)");
        eprintln!("  --sheet-name <name>  Select sheet by name");
        eprintln!("  --raw-dates          Keep date cells as serial numbers");
        process::exit(1);
    }

    let input_path = &args[1];
    let mut builder = ReaderBuilder::new();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--sheet-index" => {
                let Some(index) = args.get(i + 1).and_then(|s| s.parse::<usize>().ok()) else {
                    eprintln!("Error: --sheet-index requires a number");
                    process::exit(1);
                };
                builder = builder.with_sheet_selector(SheetSelector::Index(index));
                i += 2;
            }
            "--sheet-name" => {
                let Some(name) = args.get(i + 1) else {
                    eprintln!("Error: --sheet-name requires a value");
                    process::exit(1);
                };
                builder = builder.with_sheet_selector(SheetSelector::Name(name.clone()));
                i += 2;
            }
            "--raw-dates" => {
                builder = builder.detect_dates(false);
                i += 1;
            }
            other => {
                eprintln!("Error: Unknown option '{}'", other);
                process::exit(1);
            }
        }
    }

    if let Err(e) = dump(builder, input_path) {
        match e {
            XlsxStreamError::SheetNotFound { index, count } => {
                eprintln!("Error: sheet {} does not exist ({} sheets)", index, count);
            }
            e => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}

fn dump(builder: ReaderBuilder, input_path: &str) -> Result<(), XlsxStreamError> {
    let reader = builder.build()?;
    let rows = reader.open(input_path)?;
    eprintln!("Reading sheet '{}'", rows.sheet_name());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for row in rows {
        let row = row?;
        let line = serde_json::to_string(&row)
            .map_err(|e| XlsxStreamError::Format(format!("JSON encoding failed: {}", e)))?;
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    Ok(())
}

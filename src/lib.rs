//! xlsxstream - Row-at-a-time XLSX worksheet reader
//!
//! This crate decodes the cells of one worksheet inside an XLSX package into typed
//! rows without building an in-memory model of the workbook. The worksheet entry is
//! decompressed and tokenised incrementally; each `<row>` is handed to the caller as
//! soon as it is complete, so memory holds one row at a time alongside the shared
//! strings and style tables.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxstream::{read_rows, CellValue};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     for row in read_rows("example.xlsx", 0)? {
//!         let row = row?;
//!         if let Some(CellValue::Text(name)) = row.first() {
//!             println!("{}: {} cells", name, row.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Several sheets from one package
//!
//! ```rust,no_run
//! use xlsxstream::Workbook;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut workbook = Workbook::open("example.xlsx")?;
//!     println!("1904 epoch: {}", workbook.properties().is_1904());
//!
//!     let names: Vec<String> = workbook.sheet_names().iter().map(|s| s.to_string()).collect();
//!     for name in names {
//!         let count = workbook.rows(name.as_str())?.count();
//!         println!("{}: {} rows", name, count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxstream::{ReaderBuilder, SecurityConfig, SheetSelector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = ReaderBuilder::new()
//!         .with_sheet_selector(SheetSelector::Name("Data".to_string()))
//!         .detect_dates(false) // keep date cells as serial numbers
//!         .with_security_config(SecurityConfig::new().with_max_file_size(16 * 1024 * 1024))
//!         .build()?;
//!
//!     for row in reader.open("example.xlsx")? {
//!         println!("{}", serde_json::to_string(&row?)?);
//!     }
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod cell_type;
mod date;
mod error;
mod format;
mod package;
mod parser;
mod reference;
mod security;
mod shared_strings;
mod styles;
mod types;

// 公開API
pub use api::SheetSelector;
pub use builder::{read_rows, ReaderBuilder, Rows, SheetReader, Workbook};
pub use cell_type::{CellKind, CellResolver};
pub use date::{serial_from_datetime, serial_to_datetime};
pub use error::XlsxStreamError;
pub use parser::{
    parse_document, Attribute, Completion, EventConsumer, EventSource, Flow, Phase,
    RowAssembler, RowSink, WorkbookPropertiesExtractor,
};
pub use reference::{column_of, index_to_letters, letters_to_index, split_reference, MAX_COLUMN};
pub use security::SecurityConfig;
pub use shared_strings::SharedStrings;
pub use styles::{NumberFormat, StyleTable};
pub use types::{CellValue, Row, SheetInfo, SheetVisibility, WorkbookProperties};

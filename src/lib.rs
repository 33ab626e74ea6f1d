// NoteParse - Core Library
// Exposes the parser, table model, export and dashboard for the CLI, the API server and tests

pub mod config;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod export;
pub mod parser;
pub mod table;

// Re-export commonly used types
pub use config::Config;
pub use dashboard::{daily_totals, item_shares, DailyTotal, Dashboard, ItemShare};
pub use dates::{DateInference, DateOrder};
pub use error::{ConfigError, ExportError, ParseError, TableError};
pub use export::{export, export_file_name, to_csv, to_xlsx, ExportFormat, ExportedFile, SHEET_NAME, XLSX_MIME};
pub use parser::{
    classify_line, extract_item_amount, normalize_date, parse, parse_notes,
    AmountExtractor, DateNormalizer, LineClassifier, LineKind, NoteParser,
};
pub use table::{
    CellCoercion, Column, DateValue, ExpenseRecord, GridAmount, GridRow, ParsedTable, TableEdit,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Error types for the library surface.
// Binaries wrap these in anyhow; parsing itself never fails on malformed lines.

use std::io;

use thiserror::Error;

/// Raised only by the checked entry point; line-level problems degrade silently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Please paste some notes to parse.")]
    EmptyInput,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("row {row} is out of range (table has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

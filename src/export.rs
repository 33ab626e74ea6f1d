// Spreadsheet export - single sheet "Parsed Notes", columns Date, Item, Amount, Description

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::error::{ConfigError, ExportError};
use crate::table::{cell_text, Column, ParsedTable};

pub const SHEET_NAME: &str = "Parsed Notes";
pub const FILE_PREFIX: &str = "NoteParse";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_MIME: &str = "text/csv";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => XLSX_MIME,
            ExportFormat::Csv => CSV_MIME,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ConfigError::InvalidValue {
                key: "format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// A finished download: name, content type, bytes.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Write into `dir` (created if missing) and return the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        info!(path = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

/// `NoteParse_<YYYYMMDD_HHMMSS>.<ext>`
pub fn export_file_name(format: ExportFormat, timestamp: NaiveDateTime) -> String {
    format!(
        "{}_{}.{}",
        FILE_PREFIX,
        timestamp.format(TIMESTAMP_FORMAT),
        format.extension()
    )
}

/// Serialize `table` in `format`, named after `timestamp`.
pub fn export(table: &ParsedTable, format: ExportFormat, timestamp: NaiveDateTime) -> Result<ExportedFile, ExportError> {
    let bytes = match format {
        ExportFormat::Xlsx => to_xlsx(table)?,
        ExportFormat::Csv => to_csv(table)?,
    };

    let file = ExportedFile {
        file_name: export_file_name(format, timestamp),
        mime: format.mime(),
        bytes,
    };
    info!(file = %file.file_name, rows = table.len(), "table exported");
    Ok(file)
}

/// Workbook with one sheet: bold header row, then one row per record.
pub fn to_xlsx(table: &ParsedTable) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for column in Column::ALL {
            worksheet.write_string_with_format(0, column.index() as u16, column.name(), &header)?;
        }

        for (i, record) in table.iter().enumerate() {
            let row = (i + 1) as u32;
            for column in Column::ALL {
                let col = column.index() as u16;
                match column {
                    // Numbers stay numeric so the sheet can sum them
                    Column::Amount => {
                        if let Some(amount) = record.amount {
                            worksheet.write_number(row, col, amount)?;
                        }
                    }
                    _ => {
                        let text = cell_text(record, column);
                        if !text.is_empty() {
                            worksheet.write_string(row, col, text)?;
                        }
                    }
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Same rows as the workbook, as CSV with a header line.
pub fn to_csv(table: &ParsedTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(Column::ALL.iter().map(|c| c.name()))?;

    for record in table {
        writer.write_record(Column::ALL.iter().map(|c| cell_text(record, *c)))?;
    }

    writer.into_inner().map_err(|err| ExportError::Io(err.into_error()))
}

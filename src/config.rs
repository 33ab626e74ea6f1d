use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::dates::{DateInference, DateOrder};
use crate::error::ConfigError;
use crate::parser::NoteParser;
use crate::table::CellCoercion;

pub const DEFAULT_CONFIG_FILE: &str = "noteparse.json";
pub const CONFIG_PATH_ENV: &str = "NOTEPARSE_CONFIG";

const DATE_ORDER_ENV: &str = "NOTEPARSE_DATE_ORDER";
const REFERENCE_YEAR_ENV: &str = "NOTEPARSE_REFERENCE_YEAR";
const EXPORT_DIR_ENV: &str = "NOTEPARSE_EXPORT_DIR";
const ADDR_ENV: &str = "NOTEPARSE_ADDR";
const LOG_ENV: &str = "NOTEPARSE_LOG";

/// Runtime settings shared by the CLI, the terminal UI and the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reading of ambiguous numeric headings like `4/5/2024`
    pub date_order: DateOrder,
    /// Year assumed for headings without one; current year when unset
    pub reference_year: Option<i32>,
    pub export_dir: PathBuf,
    pub server_addr: String,
    /// tracing `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_order: DateOrder::MonthFirst,
            reference_year: None,
            export_dir: PathBuf::from("."),
            server_addr: "127.0.0.1:3000".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Explicit path, else `$NOTEPARSE_CONFIG`, else `./noteparse.json` if it exists,
    /// else defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Apply `NOTEPARSE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(order) = lookup(DATE_ORDER_ENV) {
            self.date_order = order.parse()?;
        }
        if let Some(year) = lookup(REFERENCE_YEAR_ENV) {
            let parsed = year.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: REFERENCE_YEAR_ENV.to_string(),
                value: year.clone(),
            })?;
            self.reference_year = Some(parsed);
        }
        if let Some(dir) = lookup(EXPORT_DIR_ENV) {
            self.export_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup(ADDR_ENV) {
            self.server_addr = addr;
        }
        if let Some(filter) = lookup(LOG_ENV) {
            self.log_filter = filter;
        }
        Ok(())
    }

    /// Today, moved into `reference_year` when one is configured.
    pub fn reference_date(&self) -> NaiveDate {
        let today = Local::now().date_naive();
        match self.reference_year {
            Some(year) => NaiveDate::from_ymd_opt(year, today.month(), today.day())
                .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), 28))
                .unwrap_or(today),
            None => today,
        }
    }

    pub fn date_inference(&self) -> DateInference {
        DateInference::new(self.reference_date(), self.date_order)
    }

    pub fn note_parser(&self) -> NoteParser {
        NoteParser::new(self.reference_date(), self.date_order)
    }

    pub fn cell_coercion(&self) -> CellCoercion {
        CellCoercion::new(self.date_inference())
    }
}

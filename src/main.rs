// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use noteparse::{export, table::cell_text, Column, Config, Dashboard, ExportFormat, ParsedTable};

/// NoteParse - turn grouped expense notes into a table
#[derive(Parser)]
#[command(name = "noteparse")]
#[command(version, about = "Flexible parsing for grouped expense notes", long_about = None)]
struct Cli {
    /// Config file (JSON)
    #[arg(short, long, env = "NOTEPARSE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse notes and print the table
    Parse {
        /// Notes file, or "-" for stdin
        input: Option<PathBuf>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse notes and write a spreadsheet
    Export {
        /// Notes file, or "-" for stdin
        input: Option<PathBuf>,

        /// xlsx or csv
        #[arg(short, long, default_value = "xlsx")]
        format: ExportFormat,

        /// Output directory (defaults to the configured export_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse notes and print spend per day and per item
    Dashboard {
        /// Notes file, or "-" for stdin
        input: Option<PathBuf>,

        /// Print the dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse notes and open the editable table
    Ui {
        /// Notes file, or "-" for stdin
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;

    init_logging(&cli, &config);

    match cli.command {
        Commands::Parse { input, json } => {
            let table = load_table(input, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }
        Commands::Export { input, format, out } => {
            let table = load_table(input, &config)?;
            let file = export(&table, format, Local::now().naive_local())?;
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            let path = file
                .write_to(&dir)
                .with_context(|| format!("Failed to write export into {}", dir.display()))?;
            println!("✓ Exported {} rows to {}", table.len(), path.display());
        }
        Commands::Dashboard { input, json } => {
            let table = load_table(input, &config)?;
            let dashboard = Dashboard::from_table(&table, &config.date_inference());
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print_dashboard(&dashboard);
            }
        }
        Commands::Ui { input } => {
            let table = load_table(input, &config)?;
            run_ui_mode(table, &config)?;
        }
    }

    Ok(())
}

/// `-v` raises the level; `RUST_LOG` wins over both. Logs go to stderr.
fn init_logging(cli: &Cli, config: &Config) {
    let level = match cli.verbose {
        0 => config.log_filter.as_str(),
        1 => "debug",
        _ => "trace",
    };

    // Keep the terminal UI clean unless asked otherwise
    let level = match (&cli.command, cli.verbose) {
        (Commands::Ui { .. }, 0) => "off",
        _ => level,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[cfg(feature = "tui")]
fn run_ui_mode(table: ParsedTable, config: &Config) -> Result<()> {
    let mut app = ui::App::new(table, config);
    ui::run_ui(&mut app)?;

    let table = app.into_table();
    println!("\n✅ UI closed with {} rows", table.len());
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_table: ParsedTable, _config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web UI: cargo run --bin noteparse-server --features server");
    std::process::exit(1);
}

fn read_input(input: Option<PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read notes from {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read notes from stdin")?;
            Ok(text)
        }
    }
}

fn load_table(input: Option<PathBuf>, config: &Config) -> Result<ParsedTable> {
    let text = read_input(input)?;
    match config.note_parser().parse_checked(&text) {
        Ok(table) => {
            info!(rows = table.len(), "notes parsed");
            Ok(table)
        }
        Err(err) => bail!("⚠️  {}", err),
    }
}

fn print_table(table: &ParsedTable) {
    let widths: Vec<usize> = Column::ALL
        .iter()
        .map(|column| {
            table
                .iter()
                .map(|r| cell_text(r, *column).chars().count())
                .chain(std::iter::once(column.name().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = Column::ALL
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column.name(), width = *width))
        .collect();
    println!("{}", header.join("  "));
    println!("{}", widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("  "));

    for record in table {
        let cells: Vec<String> = Column::ALL
            .iter()
            .zip(&widths)
            .map(|(column, width)| match column {
                Column::Amount => format!("{:>width$}", cell_text(record, *column), width = *width),
                _ => format!("{:<width$}", cell_text(record, *column), width = *width),
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }

    println!("\n{} rows", table.len());
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("📊 Total Spend per Day");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let max = dashboard
        .daily_totals
        .iter()
        .map(|d| d.total)
        .fold(0.0_f64, f64::max);
    for day in &dashboard.daily_totals {
        let bar_len = if max > 0.0 { (day.total.max(0.0) / max * 30.0).round() as usize } else { 0 };
        println!(
            "{}  {:>10.2}  {}",
            day.date.format("%Y-%m-%d"),
            day.total,
            "█".repeat(bar_len)
        );
    }
    if dashboard.rows_without_date > 0 {
        println!("({} rows without a date not charted)", dashboard.rows_without_date);
    }

    println!("\n🥧 Spend by Item");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for share in &dashboard.item_shares {
        println!("{:<24} {:>10.2}  {:>5.1}%", share.item, share.total, share.share * 100.0);
    }
    if dashboard.rows_without_amount > 0 {
        println!("({} rows without an amount not charted)", dashboard.rows_without_amount);
    }

    println!("\nTotal: {:.2}", dashboard.grand_total);
}
